//! Deterministic synthetic scenes.
//!
//! `stub://<name>?frames=10&person=5&width=320&height=240` yields `frames`
//! frames. The first `person` of them show a striped, person-shaped
//! silhouette centred in the frame on a flat grey background; the remaining
//! frames are flat grey. Missing keys take the defaults below.

use anyhow::{anyhow, bail, Context, Result};
use image::{Rgb, RgbImage};

use super::FrameSource;
use crate::detect::DetectionBox;
use crate::frame::Frame;

pub const SYNTHETIC_SCHEME: &str = "stub://";

const DEFAULT_FRAMES: u64 = 100;
const DEFAULT_WIDTH: u32 = 320;
const DEFAULT_HEIGHT: u32 = 240;
/// Largest accepted frame side.
const MAX_SIDE: u32 = 8192;
const BACKGROUND: Rgb<u8> = Rgb([128, 128, 128]);
const STRIPE_LIGHT: Rgb<u8> = Rgb([250, 250, 250]);
const STRIPE_DARK: Rgb<u8> = Rgb([10, 10, 10]);

/// Silhouette parts relative to the figure's top-left corner: head, torso, legs.
const FIGURE: (u32, u32) = (48, 128);
const FIGURE_PARTS: [(u32, u32, u32, u32); 4] = [
    (12, 0, 24, 24),
    (0, 24, 48, 56),
    (4, 80, 16, 48),
    (28, 80, 16, 48),
];

pub struct SyntheticSource {
    url: String,
    frames: u64,
    person_frames: u64,
    width: u32,
    height: u32,
    produced: u64,
}

impl SyntheticSource {
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(SYNTHETIC_SCHEME)
            .ok_or_else(|| anyhow!("synthetic sources use the {} scheme", SYNTHETIC_SCHEME))?;
        let query = rest.split_once('?').map(|(_, q)| q).unwrap_or("");

        let mut frames = DEFAULT_FRAMES;
        let mut person_frames = None;
        let mut width = DEFAULT_WIDTH;
        let mut height = DEFAULT_HEIGHT;
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed query parameter '{}'", pair))?;
            match key {
                "frames" => frames = parse_number(key, value)?,
                "person" => person_frames = Some(parse_number(key, value)?),
                "width" => width = parse_number(key, value)?,
                "height" => height = parse_number(key, value)?,
                other => bail!("unknown synthetic source parameter '{}'", other),
            }
        }
        if width == 0 || height == 0 {
            bail!("synthetic frame size must be non-zero");
        }
        if width > MAX_SIDE || height > MAX_SIDE {
            bail!(
                "synthetic frame size {}x{} exceeds {}x{}",
                width,
                height,
                MAX_SIDE,
                MAX_SIDE
            );
        }

        Ok(Self {
            url: url.to_string(),
            frames,
            person_frames: person_frames.unwrap_or(frames).min(frames),
            width,
            height,
            produced: 0,
        })
    }

    /// Where the silhouette is drawn, or `None` if it does not fit the frame.
    pub fn person_region(&self) -> Option<DetectionBox> {
        if self.width < FIGURE.0 || self.height < FIGURE.1 {
            return None;
        }
        Some(DetectionBox::new(
            ((self.width - FIGURE.0) / 2) as i32,
            ((self.height - FIGURE.1) / 2) as i32,
            FIGURE.0 as i32,
            FIGURE.1 as i32,
        ))
    }

    /// Whether the 1-based frame `index` shows the silhouette.
    pub fn shows_person(&self, index: u64) -> bool {
        index >= 1 && index <= self.person_frames
    }

    fn render(&self, with_person: bool) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        let Some(region) = self.person_region().filter(|_| with_person) else {
            return image;
        };
        let (ox, oy) = (region.x as u32, region.y as u32);
        for (px, py, pw, ph) in FIGURE_PARTS {
            for y in oy + py..oy + py + ph {
                for x in ox + px..ox + px + pw {
                    let stripe = if (x / 2) % 2 == 0 { STRIPE_LIGHT } else { STRIPE_DARK };
                    image.put_pixel(x, y, stripe);
                }
            }
        }
        image
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("invalid value '{}' for '{}'", value, key))
}

impl FrameSource for SyntheticSource {
    fn describe(&self) -> String {
        format!("{} (synthetic {}x{})", self.url, self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.produced >= self.frames {
            return Ok(None);
        }
        self.produced += 1;
        let image = self.render(self.shows_person(self.produced));
        Ok(Some(Frame::new(image)))
    }

    fn frames_captured(&self) -> u64 {
        self.produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_and_defaults() -> Result<()> {
        let source = SyntheticSource::from_url("stub://walk?frames=10&person=5")?;
        assert_eq!(source.frames, 10);
        assert_eq!(source.person_frames, 5);
        assert_eq!((source.width, source.height), (DEFAULT_WIDTH, DEFAULT_HEIGHT));

        let bare = SyntheticSource::from_url("stub://scene")?;
        assert_eq!(bare.frames, DEFAULT_FRAMES);
        assert_eq!(bare.person_frames, DEFAULT_FRAMES);
        Ok(())
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(SyntheticSource::from_url("stub://x?frames=ten").is_err());
        assert!(SyntheticSource::from_url("stub://x?speed=2").is_err());
        assert!(SyntheticSource::from_url("stub://x?width=0").is_err());
        assert!(SyntheticSource::from_url("file:///x").is_err());
    }

    #[test]
    fn oversized_frames_are_rejected_before_allocation() {
        for url in [
            "stub://x?width=4294967295&height=4294967295",
            "stub://x?width=8193",
            "stub://x?height=100000",
        ] {
            let err = match SyntheticSource::from_url(url) {
                Ok(_) => panic!("{} should be rejected", url),
                Err(err) => err,
            };
            assert!(err.to_string().contains("exceeds"), "{}: {}", url, err);
        }
        assert!(SyntheticSource::from_url("stub://x?width=8192&height=64").is_ok());
    }

    #[test]
    fn person_only_in_leading_frames() -> Result<()> {
        let mut source = SyntheticSource::from_url("stub://walk?frames=4&person=2")?;
        let region = source.person_region().expect("figure fits");
        assert_eq!(region, DetectionBox::new(136, 56, 48, 128));

        let mut textured = Vec::new();
        while let Some(frame) = source.next_frame()? {
            let image = frame.image();
            assert_eq!(image.dimensions(), (320, 240));
            textured.push(image.pixels().any(|p| *p != BACKGROUND));
        }
        assert_eq!(textured, vec![true, true, false, false]);
        Ok(())
    }

    #[test]
    fn tiny_frames_have_no_figure() -> Result<()> {
        let mut source = SyntheticSource::from_url("stub://tiny?frames=1&width=20&height=20")?;
        assert!(source.person_region().is_none());
        let frame = source.next_frame()?.expect("one frame");
        assert!(frame.image().pixels().all(|p| *p == BACKGROUND));
        Ok(())
    }
}
