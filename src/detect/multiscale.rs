use anyhow::Result;
use image::RgbImage;

use super::backend::{ScanParams, WindowClassifier};
use super::backends::HogSvmClassifier;
use super::grouping::{group_meanshift, group_rectangles};
use super::mode::{DetectorMode, ModeSelector};
use super::model::DetectorModel;
use super::params::{DetectionParams, GroupingPolicy, GROUP_EPS};
use super::pyramid::{level_scales, scale_image};
use super::result::{Detection, DetectionBox};

/// Multi-scale person detector with two switchable models.
///
/// Each call scans an image pyramid with the active mode's classifier, maps
/// hits back to frame coordinates and groups them. Nothing persists between
/// calls except the mode.
pub struct MultiScaleDetector {
    default: Box<dyn WindowClassifier>,
    daimler: Box<dyn WindowClassifier>,
    selector: ModeSelector,
}

impl MultiScaleDetector {
    pub fn new(default: Box<dyn WindowClassifier>, daimler: Box<dyn WindowClassifier>) -> Self {
        Self {
            default,
            daimler,
            selector: ModeSelector::new(),
        }
    }

    pub fn from_models(default: DetectorModel, daimler: DetectorModel) -> Self {
        Self::new(
            Box::new(HogSvmClassifier::new(default)),
            Box::new(HogSvmClassifier::new(daimler)),
        )
    }

    pub fn mode(&self) -> DetectorMode {
        self.selector.mode()
    }

    /// Switch models; takes effect from the next `detect` call.
    pub fn toggle_mode(&mut self) -> DetectorMode {
        let mode = self.selector.toggle();
        log::info!("detector mode switched to {}", mode);
        mode
    }

    fn classifier(&self, mode: DetectorMode) -> &dyn WindowClassifier {
        match mode {
            DetectorMode::Default => self.default.as_ref(),
            DetectorMode::Daimler => self.daimler.as_ref(),
        }
    }

    /// Detect people with the active mode.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<DetectionBox>> {
        self.detect_with_mode(self.mode(), image)
    }

    /// Detect people with an explicit mode, leaving the active mode alone.
    ///
    /// Output is sorted by (y, x, width, height) and does not depend on the
    /// order the classifier reports hits in. An empty image yields no boxes.
    pub fn detect_with_mode(&self, mode: DetectorMode, image: &RgbImage) -> Result<Vec<DetectionBox>> {
        if image.width() == 0 || image.height() == 0 {
            log::debug!("skipping detection on empty image");
            return Ok(Vec::new());
        }

        let params = DetectionParams::for_mode(mode);
        let classifier = self.classifier(mode);
        let window = classifier.window_size();
        let scan = ScanParams {
            hit_threshold: params.hit_threshold,
            win_stride: params.win_stride,
            padding: params.padding,
        };

        let scales = level_scales(image.dimensions(), window, params.scale_step, params.max_levels);
        let mut raw = Vec::new();
        for &scale in &scales {
            let level = scale_image(image, scale);
            for hit in classifier.scan_level(&level, &scan)? {
                raw.push(Detection {
                    rect: DetectionBox::new(
                        (hit.x as f64 * scale).round() as i32,
                        (hit.y as f64 * scale).round() as i32,
                        (window.0 as f64 * scale).round() as i32,
                        (window.1 as f64 * scale).round() as i32,
                    ),
                    weight: hit.score,
                    scale,
                });
            }
        }

        raw.sort_by(|a, b| {
            a.rect
                .cmp(&b.rect)
                .then(a.weight.total_cmp(&b.weight))
                .then(a.scale.total_cmp(&b.scale))
        });

        let mut boxes = match params.grouping {
            GroupingPolicy::Neighbors => group_rectangles(&raw, params.group_threshold, GROUP_EPS),
            GroupingPolicy::MeanShift => {
                group_meanshift(&raw, window, params.group_threshold as f64)
            }
        };
        boxes.sort();

        log::debug!(
            "{} [{}]: {} levels, {} raw hits, {} boxes",
            classifier.name(),
            mode,
            scales.len(),
            raw.len(),
            boxes.len()
        );
        Ok(boxes)
    }
}
