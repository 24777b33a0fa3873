//! Image pyramid for the multi-scale window scan.

use image::imageops::{self, FilterType};
use image::RgbImage;
use std::borrow::Cow;

/// Scales scanned for an image, smallest (1.0) first.
///
/// Level `k` has scale `step^k`; levels continue while the downscaled image
/// still holds one full window, up to `max_levels`. At least one level is
/// always returned so undersized images still get a (padded) scan.
pub fn level_scales(image: (u32, u32), window: (u32, u32), step: f64, max_levels: usize) -> Vec<f64> {
    let mut scales = Vec::new();
    let mut scale = 1.0f64;
    while scales.len() < max_levels {
        let w = (image.0 as f64 / scale).round();
        let h = (image.1 as f64 / scale).round();
        if w < window.0 as f64 || h < window.1 as f64 {
            break;
        }
        scales.push(scale);
        if step <= 1.0 {
            break;
        }
        scale *= step;
    }
    if scales.is_empty() {
        scales.push(1.0);
    }
    scales
}

/// Size of the level image for `scale`.
pub fn level_size(image: (u32, u32), scale: f64) -> (u32, u32) {
    (
        ((image.0 as f64 / scale).round() as u32).max(1),
        ((image.1 as f64 / scale).round() as u32).max(1),
    )
}

/// Bilinear downscale of `image` by `scale`; borrows when no resize is needed.
pub fn scale_image(image: &RgbImage, scale: f64) -> Cow<'_, RgbImage> {
    let (w, h) = level_size(image.dimensions(), scale);
    if (w, h) == image.dimensions() {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(imageops::resize(image, w, h, FilterType::Triangle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_grow_geometrically_until_window_no_longer_fits() {
        let scales = level_scales((128, 256), (64, 128), 1.05, 64);
        assert_eq!(scales[0], 1.0);
        for pair in scales.windows(2) {
            assert!((pair[1] / pair[0] - 1.05).abs() < 1e-12);
        }
        let last = *scales.last().unwrap();
        assert!((128.0 / last).round() >= 64.0);
        assert!((128.0 / (last * 1.05)).round() < 64.0);
    }

    #[test]
    fn level_count_is_capped() {
        let scales = level_scales((10_000, 10_000), (64, 128), 1.05, 64);
        assert_eq!(scales.len(), 64);
    }

    #[test]
    fn undersized_image_still_gets_one_level() {
        assert_eq!(level_scales((20, 20), (64, 128), 1.05, 64), vec![1.0]);
    }

    #[test]
    fn unit_scale_borrows() {
        let image = RgbImage::new(40, 30);
        assert!(matches!(scale_image(&image, 1.0), Cow::Borrowed(_)));
        let half = scale_image(&image, 2.0);
        assert_eq!(half.dimensions(), (20, 15));
    }
}
