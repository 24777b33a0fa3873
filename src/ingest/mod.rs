//! Frame sources.
//!
//! - Synthetic scenes (`stub://` URLs) for tests and demos
//! - Still images and directories of image frames
//! - Local video files (feature: ingest-file-ffmpeg)
//! - V4L2 cameras (feature: ingest-v4l2)
//!
//! Every source yields owned RGB `Frame`s, one per call, and reports the end
//! of the stream as `Ok(None)`.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::Result;
use std::fmt;

use crate::frame::Frame;

pub use file::FileSource;
pub use synthetic::{SyntheticSource, SYNTHETIC_SCHEME};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{CameraConfig, CameraSource};

/// Produces successive colour frames.
pub trait FrameSource {
    /// Human-readable source name for logs and errors.
    fn describe(&self) -> String;

    /// Next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn frames_captured(&self) -> u64;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn frames_captured(&self) -> u64 {
        (**self).frames_captured()
    }
}

/// Which source the loop should read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSelector {
    /// Capture device index; `n` is `/dev/video{n}`.
    Camera(u32),
    /// Image, image directory, video file or `stub://` scene.
    Video(String),
}

impl fmt::Display for SourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSelector::Camera(index) => write!(f, "camera {}", index),
            SourceSelector::Video(path) => write!(f, "video '{}'", path),
        }
    }
}

/// The requested source could not be opened.
#[derive(Clone, Debug)]
pub struct SourceUnavailable {
    pub source: String,
    pub reason: String,
}

impl fmt::Display for SourceUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot open {}: {}", self.source, self.reason)
    }
}

impl std::error::Error for SourceUnavailable {}

/// Open the source named by `selector`.
///
/// Any failure is reported as a `SourceUnavailable` so callers can tell it
/// apart from configuration problems.
pub fn open_source(selector: &SourceSelector) -> Result<Box<dyn FrameSource>> {
    let opened: Result<Box<dyn FrameSource>> = match selector {
        SourceSelector::Video(path) if path.starts_with(SYNTHETIC_SCHEME) => {
            SyntheticSource::from_url(path).map(|s| Box::new(s) as Box<dyn FrameSource>)
        }
        SourceSelector::Video(path) => {
            FileSource::open(path).map(|s| Box::new(s) as Box<dyn FrameSource>)
        }
        SourceSelector::Camera(index) => open_camera(*index),
    };
    opened.map_err(|err| {
        anyhow::Error::new(SourceUnavailable {
            source: selector.to_string(),
            reason: format!("{:#}", err),
        })
    })
}

#[cfg(feature = "ingest-v4l2")]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>> {
    let source = CameraSource::open(CameraConfig::for_index(index))?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_camera(_index: u32) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!("camera capture requires the ingest-v4l2 feature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unopenable_sources_are_source_unavailable() {
        for selector in [
            SourceSelector::Video("/nonexistent/clip.png".to_string()),
            SourceSelector::Video("rtsp://camera.local/stream".to_string()),
        ] {
            let err = match open_source(&selector) {
                Ok(_) => panic!("{} should not open", selector),
                Err(err) => err,
            };
            let unavailable = err
                .downcast_ref::<SourceUnavailable>()
                .expect("source error type");
            assert_eq!(unavailable.source, selector.to_string());
        }
    }

    #[test]
    fn stub_urls_open_synthetic_scenes() -> Result<()> {
        let mut source = open_source(&SourceSelector::Video("stub://walk?frames=2".into()))?;
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.frames_captured(), 2);
        Ok(())
    }

    #[cfg(not(feature = "ingest-v4l2"))]
    #[test]
    fn camera_without_capture_feature_names_the_feature() {
        let err = match open_source(&SourceSelector::Camera(0)) {
            Ok(_) => panic!("camera should not open without capture support"),
            Err(err) => err,
        };
        let unavailable = err
            .downcast_ref::<SourceUnavailable>()
            .expect("source error type");
        assert_eq!(unavailable.source, "camera 0");
        assert!(unavailable.reason.contains("ingest-v4l2"), "{}", unavailable.reason);
    }

    #[test]
    fn selector_display_names_the_source() {
        assert_eq!(SourceSelector::Camera(1).to_string(), "camera 1");
        assert_eq!(
            SourceSelector::Video("a.mp4".into()).to_string(),
            "video 'a.mp4'"
        );
    }
}
