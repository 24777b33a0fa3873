//! Pedestrian detection demo.
//!
//! A multi-scale sliding-window person detector (gradient histograms scored by
//! a linear model) runs on every frame of a camera or video. Raw detections
//! are outlined on the live frame; a second "background subtracted" view shows
//! only the pixels inside the (tightened) detections on black.
//!
//! # Module Structure
//!
//! - `frame`: per-cycle pixel buffers (Frame, Canvas)
//! - `ingest`: frame sources (synthetic scenes, images, video files, V4L2)
//! - `detect`: window classifier, image pyramid, grouping, mode selection
//! - `compose`: draws detections and fills the canvas
//! - `display`, `input`, `pacing`: render surfaces, keys, cycle tick
//! - `highgui`: live windows and window keys (feature: display-highgui)
//! - `pipeline`: the per-cycle loop tying it together
//! - `config`: JSON file + environment + command-line configuration
//!
//! # Cycle
//!
//! ```text
//! FrameSource -> MultiScaleDetector -> adjust_box -> Compositor -> RenderSurface
//!                     ^                                               |
//!                 ModeSelector <------------- KeySource <-------------+
//! ```

pub mod compose;
pub mod config;
pub mod detect;
pub mod display;
pub mod frame;
#[cfg(feature = "display-highgui")]
pub mod highgui;
pub mod ingest;
pub mod input;
pub mod pacing;
pub mod pipeline;

pub use compose::{CanvasBounds, CompositeStats, Compositor};
pub use config::{AppConfig, ConfigOverrides, ModelPaths, OutputSettings};
pub use detect::{
    adjust_box, DetectionBox, DetectorMode, DetectorModel, HogLayout, HogSvmClassifier,
    MultiScaleDetector, WindowClassifier,
};
pub use display::{ImageDirSurface, NullSurface, RenderSurface, WindowId};
pub use frame::{Canvas, Frame};
#[cfg(feature = "display-highgui")]
pub use highgui::{HighguiKeys, HighguiWindows};
pub use ingest::{open_source, FileSource, FrameSource, SourceSelector, SourceUnavailable, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use ingest::{CameraConfig, CameraSource};
pub use input::{decode_keys, key_from_wait_code, Key, KeySource, ScriptedKeys, TerminalKeys};
pub use pacing::FramePacer;
pub use pipeline::{CycleOutcome, CycleReport, DetectionLoop, LoopSummary, StopReason};

/// Build the two-mode detector from configured weight files.
///
/// Modes without a configured file use the gradient-energy placeholder.
pub fn build_detector(models: &ModelPaths) -> anyhow::Result<MultiScaleDetector> {
    let default =
        DetectorModel::load_or_placeholder(models.default.as_deref(), HogLayout::default_people())?;
    let daimler =
        DetectorModel::load_or_placeholder(models.daimler.as_deref(), HogLayout::daimler_people())?;
    Ok(MultiScaleDetector::from_models(default, daimler))
}
