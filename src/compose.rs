//! Per-cycle compositing of detections onto the frame and canvas.
//!
//! The frame gets every raw box outlined. The canvas receives the frame's
//! pixels inside each adjusted box plus that box's outline, so it shows only
//! the detected people on black. Pixels are copied before the frame is
//! annotated; the canvas never picks up raw-box outlines.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::Deserialize;

use crate::detect::{adjust_box, DetectionBox};
use crate::frame::{Canvas, Frame};

pub const OUTLINE_GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const OUTLINE_THICKNESS: u32 = 2;

/// How an adjusted box selects the canvas pixels copied from the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CanvasBounds {
    /// `[x, x + width) x [y, y + height)`: the box itself.
    #[default]
    Extent,
    /// `[x, width) x [y, height)`: width and height read as end coordinates,
    /// matching the classic demo's copy loop.
    EndCoordinates,
}

impl CanvasBounds {
    /// Pixel span to copy for `rect`, clamped to a `width` x `height` image.
    ///
    /// Returns `(x0, y0, x1, y1)` with exclusive ends, or `None` when empty.
    pub fn copy_region(self, rect: &DetectionBox, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let (x_end, y_end) = match self {
            CanvasBounds::Extent => (rect.right() as i64, rect.bottom() as i64),
            CanvasBounds::EndCoordinates => (rect.width as i64, rect.height as i64),
        };
        let x0 = (rect.x as i64).clamp(0, width as i64);
        let y0 = (rect.y as i64).clamp(0, height as i64);
        let x1 = x_end.clamp(0, width as i64);
        let y1 = y_end.clamp(0, height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// What one `compose` call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositeStats {
    /// Raw boxes outlined on the frame.
    pub frame_boxes: usize,
    /// Adjusted boxes outlined on the canvas.
    pub canvas_boxes: usize,
    pub pixels_copied: u64,
}

#[derive(Clone, Debug)]
pub struct Compositor {
    bounds: CanvasBounds,
    color: Rgb<u8>,
    thickness: u32,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(CanvasBounds::default())
    }
}

impl Compositor {
    pub fn new(bounds: CanvasBounds) -> Self {
        Self {
            bounds,
            color: OUTLINE_GREEN,
            thickness: OUTLINE_THICKNESS,
        }
    }

    pub fn bounds(&self) -> CanvasBounds {
        self.bounds
    }

    /// Composite one cycle's raw detections.
    ///
    /// The canvas is expected to be freshly reset for `frame`; a canvas of a
    /// different size is reset here first.
    pub fn compose(&self, frame: &mut Frame, canvas: &mut Canvas, boxes: &[DetectionBox]) -> CompositeStats {
        if canvas.image().dimensions() != frame.image().dimensions() {
            canvas.reset_for(frame);
        }
        let mut stats = CompositeStats::default();
        let adjusted: Vec<DetectionBox> = boxes.iter().map(|b| adjust_box(*b)).collect();

        let (width, height) = frame.image().dimensions();
        for rect in &adjusted {
            if let Some((x0, y0, x1, y1)) = self.bounds.copy_region(rect, width, height) {
                let src = frame.image();
                let dst = canvas.image_mut();
                for y in y0..y1 {
                    for x in x0..x1 {
                        dst.put_pixel(x, y, *src.get_pixel(x, y));
                    }
                }
                stats.pixels_copied += (x1 - x0) as u64 * (y1 - y0) as u64;
            }
        }

        for rect in &adjusted {
            if self.outline(canvas.image_mut(), rect) {
                stats.canvas_boxes += 1;
            }
        }
        for rect in boxes {
            if self.outline(frame.image_mut(), rect) {
                stats.frame_boxes += 1;
            }
        }
        stats
    }

    /// Draw `rect` with the stroke growing inwards. Degenerate boxes are skipped.
    fn outline(&self, image: &mut RgbImage, rect: &DetectionBox) -> bool {
        if rect.is_degenerate() {
            return false;
        }
        for inset in 0..self.thickness as i32 {
            let w = rect.width - 2 * inset;
            let h = rect.height - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let stroke = Rect::at(rect.x + inset, rect.y + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(image, stroke, self.color);
        }
        true
    }
}
