use anyhow::Result;
use image::RgbImage;

/// Window scan settings for one pyramid level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanParams {
    /// Windows scoring at or above this margin are hits.
    pub hit_threshold: f64,
    pub win_stride: (u32, u32),
    /// Border added on every side before scanning, in level pixels.
    pub padding: (u32, u32),
}

/// A window accepted by the classifier, in level coordinates.
///
/// `x`/`y` is the window's top-left corner relative to the unpadded level
/// image, so windows overlapping the padding have negative coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowHit {
    pub x: i32,
    pub y: i32,
    pub score: f64,
}

/// Fixed-size window classifier: the "is there a person in this window" step.
///
/// The multi-scale detector owns the pyramid, coordinate mapping and grouping;
/// implementations only score every window position of a single level.
///
/// Implementations must be pure with respect to the level image: no state may
/// carry over from one `scan_level` call to the next.
pub trait WindowClassifier: Send {
    /// Classifier identifier for logs.
    fn name(&self) -> &'static str;

    /// Detection window (width, height) in level pixels.
    fn window_size(&self) -> (u32, u32);

    /// Score every window position of `level` and return the hits.
    fn scan_level(&self, level: &RgbImage, scan: &ScanParams) -> Result<Vec<WindowHit>>;
}
