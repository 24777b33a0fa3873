use image::{Rgb, RgbImage};

use hog_pedestrian::detect::{adjust_box, DetectionBox, DetectorMode, ModeSelector};
use hog_pedestrian::{build_detector, ModelPaths, MultiScaleDetector, SyntheticSource};
use hog_pedestrian::{Frame, FrameSource};

fn placeholder_detector() -> MultiScaleDetector {
    build_detector(&ModelPaths::default()).expect("placeholder models")
}

fn person_frame() -> Frame {
    let mut source = SyntheticSource::from_url("stub://still?frames=1").expect("stub url");
    source
        .next_frame()
        .expect("render frame")
        .expect("one frame")
}

#[test]
fn adjusted_boxes_stay_inside_the_raw_box() {
    for width in (1..200).step_by(7) {
        for height in (1..260).step_by(11) {
            let raw = DetectionBox::new(-13, 40, width, height);
            let adjusted = adjust_box(raw);
            assert_eq!(adjusted, adjust_box(raw), "adjust_box must be deterministic");
            assert!(adjusted.x >= raw.x && adjusted.y >= raw.y, "{raw:?} -> {adjusted:?}");
            assert!(
                adjusted.right() <= raw.right() && adjusted.bottom() <= raw.bottom(),
                "{raw:?} -> {adjusted:?}"
            );
        }
    }
}

#[test]
fn toggling_twice_restores_the_mode() {
    let mut selector = ModeSelector::new();
    assert_eq!(selector.mode(), DetectorMode::Default);
    assert_eq!(selector.toggle(), DetectorMode::Daimler);
    assert_eq!(selector.toggle(), DetectorMode::Default);

    let mut detector = placeholder_detector();
    let start = detector.mode();
    detector.toggle_mode();
    detector.toggle_mode();
    assert_eq!(detector.mode(), start);
}

#[test]
fn empty_and_undersized_images_yield_nothing_in_both_modes() {
    let detector = placeholder_detector();
    let empty = RgbImage::new(0, 0);
    let tiny = RgbImage::from_pixel(40, 80, Rgb([200, 10, 10]));
    for mode in [DetectorMode::Default, DetectorMode::Daimler] {
        assert!(detector.detect_with_mode(mode, &empty).unwrap().is_empty());
        assert!(detector.detect_with_mode(mode, &tiny).unwrap().is_empty());
    }
}

#[test]
fn flat_frames_have_no_detections() {
    let detector = placeholder_detector();
    let flat = RgbImage::from_pixel(320, 240, Rgb([128, 128, 128]));
    for mode in [DetectorMode::Default, DetectorMode::Daimler] {
        assert!(detector.detect_with_mode(mode, &flat).unwrap().is_empty());
    }
}

#[test]
fn detection_is_repeatable_and_sorted() {
    let detector = placeholder_detector();
    let frame = person_frame();
    let first = detector.detect(frame.image()).unwrap();
    let second = detector.detect(frame.image()).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert!(first.windows(2).all(|pair| pair[0] <= pair[1]));
}
