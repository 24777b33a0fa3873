//! Box shrink applied before compositing.
//!
//! HOG windows carry a margin of background around the person, so detections
//! are tightened: 10% off the left, 7% off the top, 80% of the original size.
//! Rounding is half away from zero (`f64::round`).

use super::result::DetectionBox;

const X_OFFSET: f64 = 0.1;
const Y_OFFSET: f64 = 0.07;
const SIZE_FACTOR: f64 = 0.8;

/// Shrink a raw detection. Pure: the input box is not modified.
pub fn adjust_box(rect: DetectionBox) -> DetectionBox {
    let w = rect.width as f64;
    let h = rect.height as f64;
    DetectionBox::new(
        rect.x + (w * X_OFFSET).round() as i32,
        rect.y + (h * Y_OFFSET).round() as i32,
        (w * SIZE_FACTOR).round() as i32,
        (h * SIZE_FACTOR).round() as i32,
    )
}
