//! Raw capture buffers to RGB images.

use anyhow::{anyhow, bail, Result};
use image::{Rgb, RgbImage};

/// Pixel layouts a capture backend may hand over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 8-bit R, G, B.
    Rgb24,
    /// Full-resolution Y plane, then interleaved half-resolution U/V.
    Nv12,
    /// Packed 4:2:2 (Y0 U Y1 V), the usual webcam layout.
    Yuyv,
}

impl PixelFormat {
    /// Bytes a `width` x `height` buffer must hold.
    pub fn buffer_len(self, width: u32, height: u32) -> Result<usize> {
        let pixels = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| anyhow!("{:?} frame dimensions overflow", self))?;
        let len = match self {
            PixelFormat::Rgb24 => pixels.checked_mul(3),
            PixelFormat::Nv12 => pixels.checked_add(pixels / 2),
            PixelFormat::Yuyv => pixels.checked_mul(2),
        };
        len.ok_or_else(|| anyhow!("{:?} frame dimensions overflow", self))
    }
}

/// Decode a captured buffer into an RGB image.
///
/// The buffer length must match the format exactly; YUYV also needs an even
/// width since two pixels share one chroma pair.
pub fn to_rgb_image(pixels: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<RgbImage> {
    if format == PixelFormat::Yuyv && width % 2 != 0 {
        bail!("YUYV frame width must be even, got {}", width);
    }
    let expected = format.buffer_len(width, height)?;
    if pixels.len() != expected {
        bail!(
            "{:?} frame length mismatch: expected {}, got {}",
            format,
            expected,
            pixels.len()
        );
    }

    let image = match format {
        PixelFormat::Rgb24 => RgbImage::from_raw(width, height, pixels.to_vec())
            .ok_or_else(|| anyhow!("RGB buffer does not match {}x{}", width, height))?,
        PixelFormat::Nv12 => {
            let (w, luma) = (width as usize, width as usize * height as usize);
            RgbImage::from_fn(width, height, |x, y| {
                let (x, y) = (x as usize, y as usize);
                let chroma = luma + (y / 2) * w + (x / 2) * 2;
                yuv_pixel(pixels[y * w + x], pixels[chroma], pixels[chroma + 1])
            })
        }
        PixelFormat::Yuyv => {
            let w = width as usize;
            RgbImage::from_fn(width, height, |x, y| {
                let pair = (y as usize * w + (x as usize & !1)) * 2;
                let luma = if x % 2 == 0 { pixels[pair] } else { pixels[pair + 2] };
                yuv_pixel(luma, pixels[pair + 1], pixels[pair + 3])
            })
        }
    };
    Ok(image)
}

/// BT.601 full-range conversion.
fn yuv_pixel(y: u8, u: u8, v: u8) -> Rgb<u8> {
    let (y, u, v) = (y as f32, u as f32 - 128.0, v as f32 - 128.0);
    Rgb([
        channel(y + 1.402 * v),
        channel(y - 0.344_136 * u - 0.714_136 * v),
        channel(y + 1.772 * u),
    ])
}

fn channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_chroma_keeps_luma() -> Result<()> {
        let nv12 = [128u8, 128, 128, 128, 128, 128];
        let image = to_rgb_image(&nv12, 2, 2, PixelFormat::Nv12)?;
        assert!(image.pixels().all(|p| *p == Rgb([128, 128, 128])));

        let yuyv = [50u8, 128, 200, 128];
        let image = to_rgb_image(&yuyv, 2, 1, PixelFormat::Yuyv)?;
        assert_eq!(image.get_pixel(0, 0), &Rgb([50, 50, 50]));
        assert_eq!(image.get_pixel(1, 0), &Rgb([200, 200, 200]));
        Ok(())
    }

    #[test]
    fn strong_red_chroma_saturates() -> Result<()> {
        let yuyv = [128u8, 128, 128, 255];
        let image = to_rgb_image(&yuyv, 2, 1, PixelFormat::Yuyv)?;
        let Rgb([r, g, b]) = *image.get_pixel(0, 0);
        assert_eq!(r, 255);
        assert!(g < 128);
        assert_eq!(b, 128);
        Ok(())
    }

    #[test]
    fn rejects_mismatched_buffers() {
        assert!(to_rgb_image(&[1u8; 9], 2, 3, PixelFormat::Rgb24).is_err());
        assert!(to_rgb_image(&[0u8; 5], 2, 2, PixelFormat::Nv12).is_err());
        assert!(to_rgb_image(&[0u8; 6], 3, 1, PixelFormat::Yuyv).is_err());
    }

    #[test]
    fn buffer_lengths_per_format() -> Result<()> {
        assert_eq!(PixelFormat::Rgb24.buffer_len(4, 2)?, 24);
        assert_eq!(PixelFormat::Nv12.buffer_len(4, 2)?, 12);
        assert_eq!(PixelFormat::Yuyv.buffer_len(4, 2)?, 16);
        Ok(())
    }
}
