use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::compose::CanvasBounds;
use crate::ingest::SourceSelector;
use crate::pacing::DEFAULT_TARGET_FPS;

const DEFAULT_CAMERA: u32 = 0;
const DEFAULT_SNAPSHOT_EVERY: u64 = 1;
const MAX_TARGET_FPS: u32 = 1000;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AppConfigFile {
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    output: Option<OutputConfigFile>,
    target_fps: Option<u32>,
    max_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SourceConfigFile {
    camera: Option<u32>,
    video: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    default_model: Option<PathBuf>,
    daimler_model: Option<PathBuf>,
    canvas_bounds: Option<CanvasBounds>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OutputConfigFile {
    dir: Option<PathBuf>,
    snapshot_every: Option<u64>,
}

/// Trained weight files per detector mode; `None` selects the placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelPaths {
    pub default: Option<PathBuf>,
    pub daimler: Option<PathBuf>,
}

/// Where rendered windows go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    /// Snapshot directory; `None` renders nowhere.
    pub dir: Option<PathBuf>,
    /// Write every n-th frame per window.
    pub snapshot_every: u64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: None,
            snapshot_every: DEFAULT_SNAPSHOT_EVERY,
        }
    }
}

/// Command-line values; each `Some` wins over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub camera: Option<u32>,
    pub video: Option<String>,
    pub default_model: Option<PathBuf>,
    pub daimler_model: Option<PathBuf>,
    pub canvas_bounds: Option<CanvasBounds>,
    pub output_dir: Option<PathBuf>,
    pub snapshot_every: Option<u64>,
    pub target_fps: Option<u32>,
    pub max_frames: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub camera: u32,
    /// When set, read from this path instead of the camera.
    pub video: Option<String>,
    pub models: ModelPaths,
    pub canvas_bounds: CanvasBounds,
    pub output: OutputSettings,
    pub target_fps: u32,
    pub max_frames: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_file(AppConfigFile::default())
    }
}

impl AppConfig {
    /// Resolve configuration: file (`path`, else `PEDESTRIAN_CONFIG`), then
    /// `PEDESTRIAN_*` environment variables, then `overrides`.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let env_path = std::env::var("PEDESTRIAN_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let file_cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => read_config_file(&path)?,
            None => AppConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.apply_overrides(overrides);
        cfg.validate()?;
        Ok(cfg)
    }

    /// The frame source this configuration selects.
    pub fn source(&self) -> SourceSelector {
        match &self.video {
            Some(video) => SourceSelector::Video(video.clone()),
            None => SourceSelector::Camera(self.camera),
        }
    }

    fn from_file(file: AppConfigFile) -> Self {
        let source = file.source.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let output = file.output.unwrap_or_default();
        Self {
            camera: source.camera.unwrap_or(DEFAULT_CAMERA),
            video: source.video,
            models: ModelPaths {
                default: detector.default_model,
                daimler: detector.daimler_model,
            },
            canvas_bounds: detector.canvas_bounds.unwrap_or_default(),
            output: OutputSettings {
                dir: output.dir,
                snapshot_every: output.snapshot_every.unwrap_or(DEFAULT_SNAPSHOT_EVERY),
            },
            target_fps: file.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
            max_frames: file.max_frames,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(video) = env_value("PEDESTRIAN_VIDEO") {
            self.video = Some(video);
        }
        if let Some(camera) = env_value("PEDESTRIAN_CAMERA") {
            self.camera = camera
                .parse()
                .map_err(|_| anyhow!("PEDESTRIAN_CAMERA must be a device index"))?;
        }
        if let Some(fps) = env_value("PEDESTRIAN_TARGET_FPS") {
            self.target_fps = fps
                .parse()
                .map_err(|_| anyhow!("PEDESTRIAN_TARGET_FPS must be an integer"))?;
        }
        if let Some(dir) = env_value("PEDESTRIAN_OUTPUT_DIR") {
            self.output.dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = env_value("PEDESTRIAN_DEFAULT_MODEL") {
            self.models.default = Some(PathBuf::from(path));
        }
        if let Some(path) = env_value("PEDESTRIAN_DAIMLER_MODEL") {
            self.models.daimler = Some(PathBuf::from(path));
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        // An explicit camera on the command line beats a configured video.
        if let Some(camera) = overrides.camera {
            self.camera = camera;
            self.video = None;
        }
        if let Some(video) = overrides.video {
            self.video = Some(video);
        }
        if let Some(path) = overrides.default_model {
            self.models.default = Some(path);
        }
        if let Some(path) = overrides.daimler_model {
            self.models.daimler = Some(path);
        }
        if let Some(bounds) = overrides.canvas_bounds {
            self.canvas_bounds = bounds;
        }
        if let Some(dir) = overrides.output_dir {
            self.output.dir = Some(dir);
        }
        if let Some(every) = overrides.snapshot_every {
            self.output.snapshot_every = every;
        }
        if let Some(fps) = overrides.target_fps {
            self.target_fps = fps;
        }
        if overrides.max_frames.is_some() {
            self.max_frames = overrides.max_frames;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.target_fps == 0 || self.target_fps > MAX_TARGET_FPS {
            return Err(anyhow!(
                "target_fps must be between 1 and {}, got {}",
                MAX_TARGET_FPS,
                self.target_fps
            ));
        }
        if self.output.snapshot_every == 0 {
            return Err(anyhow!("snapshot_every must be at least 1"));
        }
        if let Some(video) = &self.video {
            if video.trim().is_empty() {
                return Err(anyhow!("video path must not be empty"));
            }
        }
        if self.max_frames == Some(0) {
            return Err(anyhow!("max_frames must be at least 1 when set"));
        }
        Ok(())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_camera_zero() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.source(), SourceSelector::Camera(0));
        assert_eq!(cfg.target_fps, DEFAULT_TARGET_FPS);
        assert_eq!(cfg.canvas_bounds, CanvasBounds::Extent);
        assert_eq!(cfg.output, OutputSettings::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn command_line_camera_beats_configured_video() {
        let mut cfg = AppConfig::default();
        cfg.video = Some("clip.mp4".into());
        cfg.apply_overrides(ConfigOverrides {
            camera: Some(2),
            ..ConfigOverrides::default()
        });
        assert_eq!(cfg.source(), SourceSelector::Camera(2));
    }

    #[test]
    fn command_line_video_beats_camera() {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(ConfigOverrides {
            camera: Some(1),
            video: Some("walk.mp4".into()),
            ..ConfigOverrides::default()
        });
        assert_eq!(cfg.source(), SourceSelector::Video("walk.mp4".into()));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut cfg = AppConfig::default();
        cfg.target_fps = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.output.snapshot_every = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.video = Some("  ".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let parsed: Result<AppConfigFile, _> = serde_json::from_str(r#"{ "fps": 10 }"#);
        assert!(parsed.is_err());
    }
}
