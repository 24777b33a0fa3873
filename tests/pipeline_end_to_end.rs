use hog_pedestrian::{
    build_detector, CycleOutcome, DetectionLoop, DetectorMode, FramePacer, Key, ModelPaths,
    NullSurface, ScriptedKeys, StopReason, SyntheticSource, WindowId,
};

const SCENE: &str = "stub://walk?frames=10&person=5";

fn scene_loop(keys: ScriptedKeys) -> DetectionLoop<NullSurface, ScriptedKeys> {
    scene_loop_in(DetectorMode::Default, keys)
}

fn scene_loop_in(mode: DetectorMode, keys: ScriptedKeys) -> DetectionLoop<NullSurface, ScriptedKeys> {
    let source = SyntheticSource::from_url(SCENE).expect("stub scene");
    let mut detector = build_detector(&ModelPaths::default()).expect("placeholder models");
    if detector.mode() != mode {
        detector.toggle_mode();
    }
    DetectionLoop::new(Box::new(source), detector, NullSurface::new(), keys)
        .with_pacer(FramePacer::unpaced())
}

#[test]
fn person_frames_are_detected_and_empty_frames_leave_a_black_canvas() {
    let region = SyntheticSource::from_url(SCENE)
        .unwrap()
        .person_region()
        .expect("figure fits the frame");
    let mut detection = scene_loop(ScriptedKeys::silent());

    for index in 1..=10u64 {
        let report = match detection.step().expect("cycle") {
            CycleOutcome::Continue(report) => report,
            other => panic!("frame {index}: unexpected {other:?}"),
        };
        assert_eq!(report.frame_index, index);
        if index <= 5 {
            assert!(
                report.boxes.iter().any(|b| b.overlaps(&region)),
                "frame {index}: no box over {region:?}: {:?}",
                report.boxes
            );
            assert!(report.pixels_copied > 0);
            assert!(!detection.canvas().is_black());
        } else {
            assert!(report.boxes.is_empty(), "frame {index}: {:?}", report.boxes);
            assert_eq!(report.pixels_copied, 0);
            assert!(detection.canvas().is_black(), "frame {index}");
        }
        assert_eq!(report.canvas_detections, 0);
    }

    assert_eq!(detection.step().unwrap(), CycleOutcome::EndOfStream);
    assert_eq!(detection.surface().shown(WindowId::Detection), 10);
    assert_eq!(detection.surface().shown(WindowId::Background), 10);
}

#[test]
fn daimler_mode_groups_person_frames_and_leaves_empty_frames_black() {
    let region = SyntheticSource::from_url(SCENE)
        .unwrap()
        .person_region()
        .expect("figure fits the frame");
    let mut detection = scene_loop_in(DetectorMode::Daimler, ScriptedKeys::silent());
    assert_eq!(detection.detector().mode(), DetectorMode::Daimler);

    for index in 1..=10u64 {
        let report = match detection.step().expect("cycle") {
            CycleOutcome::Continue(report) => report,
            other => panic!("frame {index}: unexpected {other:?}"),
        };
        assert_eq!(report.mode, DetectorMode::Daimler);
        if index <= 5 {
            assert!(
                report.boxes.iter().any(|b| b.overlaps(&region)),
                "frame {index}: no box over {region:?}: {:?}",
                report.boxes
            );
            assert!(report.pixels_copied > 0);
            assert!(!detection.canvas().is_black());
        } else {
            assert!(report.boxes.is_empty(), "frame {index}: {:?}", report.boxes);
            assert!(detection.canvas().is_black(), "frame {index}");
        }
    }
    assert_eq!(detection.step().unwrap(), CycleOutcome::EndOfStream);
}

#[test]
fn run_reports_stream_end_and_mode_switches() {
    let keys = ScriptedKeys::new([None, Some(Key::ToggleMode), None, Some(Key::ToggleMode)]);
    let mut detection = scene_loop(keys);
    let summary = detection.run().expect("run");

    assert_eq!(summary.stopped_by, StopReason::EndOfStream);
    assert_eq!(summary.frames, 10);
    assert_eq!(summary.mode_switches, 2);
    assert!(summary.total_boxes >= 3);
    assert_eq!(detection.keys().polls(), 10);
}

#[test]
fn quit_key_stops_after_the_current_cycle() {
    let keys = ScriptedKeys::new([None, None, Some(Key::Quit)]);
    let mut detection = scene_loop(keys);
    let summary = detection.run().expect("run");

    assert_eq!(summary.stopped_by, StopReason::Quit);
    assert_eq!(summary.frames, 3);
    assert_eq!(detection.surface().shown(WindowId::Background), 3);
}
