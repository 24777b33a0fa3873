//! Per-cycle pixel buffers.
//!
//! - `Frame`: the colour image produced by a frame source once per cycle.
//!   Detection reads it; the compositor annotates it.
//! - `Canvas`: the "background subtracted" buffer. It is reset to black at the
//!   start of every cycle and only receives pixels copied from the frame inside
//!   detected boxes.
//!
//! Both are owned by the detection loop for the duration of a cycle. Nothing in
//! this module is shared between cycles except the canvas allocation itself.

use anyhow::Result;
use image::{Rgb, RgbImage};

use crate::ingest::normalize::{to_rgb_image, PixelFormat};

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// One captured colour image (RGB, 8 bits per channel).
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a frame from raw capture bytes, converting to RGB when needed.
    pub fn from_raw(pixels: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        Ok(Self {
            image: to_rgb_image(pixels, width, height, format)?,
        })
    }

    /// A frame filled with a single colour.
    pub fn filled(width: u32, height: u32, color: Rgb<u8>) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, color),
        }
    }

    pub fn blank(width: u32, height: u32) -> Self {
        Self::filled(width, height, BLACK)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self::new(image)
    }
}

// ----------------------------------------------------------------------------
// Canvas
// ----------------------------------------------------------------------------

/// Secondary output buffer, black except where detections copied frame pixels.
#[derive(Clone, Debug, Default)]
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the frame's dimensions and blank every pixel.
    ///
    /// The allocation is reused when the size is unchanged.
    pub fn reset_for(&mut self, frame: &Frame) {
        if self.image.dimensions() != frame.image().dimensions() {
            self.image = RgbImage::new(frame.width(), frame.height());
            return;
        }
        for pixel in self.image.pixels_mut() {
            *pixel = BLACK;
        }
    }

    pub fn is_black(&self) -> bool {
        self.image.pixels().all(|p| *p == BLACK)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_blanks_previous_contents() {
        let frame = Frame::filled(8, 6, Rgb([200, 10, 10]));
        let mut canvas = Canvas::new();
        canvas.reset_for(&frame);
        assert_eq!(canvas.image().dimensions(), (8, 6));

        canvas.image_mut().put_pixel(3, 3, Rgb([1, 2, 3]));
        assert!(!canvas.is_black());

        canvas.reset_for(&frame);
        assert!(canvas.is_black());
    }

    #[test]
    fn reset_follows_frame_size_changes() {
        let mut canvas = Canvas::new();
        canvas.reset_for(&Frame::blank(4, 4));
        canvas.reset_for(&Frame::blank(10, 2));
        assert_eq!(canvas.image().dimensions(), (10, 2));
        assert!(canvas.is_black());
    }

    #[test]
    fn from_raw_rejects_short_buffers() {
        let err = Frame::from_raw(&[0u8; 5], 2, 2, PixelFormat::Rgb24);
        assert!(err.is_err());
    }

    #[test]
    fn zero_sized_frames_are_empty() {
        assert!(Frame::blank(0, 12).is_empty());
        assert!(!Frame::blank(1, 1).is_empty());
    }
}
