/// Axis-aligned box in frame pixel coordinates.
///
/// `x`/`y` may be negative: windows scanned inside the border padding map to
/// boxes that start left of or above the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DetectionBox {
    pub y: i32,
    pub x: i32,
    pub width: i32,
    pub height: i32,
}

impl DetectionBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            y,
            x,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 * 0.5,
            self.y as f64 + self.height as f64 * 0.5,
        )
    }

    /// Area shared with `other` (zero when disjoint).
    pub fn intersection_area(&self, other: &DetectionBox) -> i64 {
        let l = self.x.max(other.x);
        let r = self.right().min(other.right());
        let t = self.y.max(other.y);
        let b = self.bottom().min(other.bottom());
        (r - l).max(0) as i64 * (b - t).max(0) as i64
    }

    pub fn overlaps(&self, other: &DetectionBox) -> bool {
        self.intersection_area(other) > 0
    }

    pub fn iou(&self, other: &DetectionBox) -> f64 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            return 0.0;
        }
        inter as f64 / union as f64
    }
}

/// A classifier hit mapped back to frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub rect: DetectionBox,
    /// Linear classifier margin of the window.
    pub weight: f64,
    /// Pyramid scale the window was found at.
    pub scale: f64,
}
