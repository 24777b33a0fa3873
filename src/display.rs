//! Render surfaces for the two output windows.

use anyhow::{Context, Result};
use image::RgbImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The two windows a cycle renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WindowId {
    /// Live frame with raw boxes.
    Detection,
    /// Black canvas with the detected regions.
    Background,
}

impl WindowId {
    pub const ALL: [WindowId; 2] = [WindowId::Detection, WindowId::Background];

    pub fn title(self) -> &'static str {
        match self {
            WindowId::Detection => "Pedestrian Detection",
            WindowId::Background => "Background Subtracted",
        }
    }

    /// Directory-safe name.
    pub fn slug(self) -> &'static str {
        match self {
            WindowId::Detection => "detection",
            WindowId::Background => "background",
        }
    }
}

/// Somewhere to show a window's image.
pub trait RenderSurface {
    fn show(&mut self, window: WindowId, image: &RgbImage) -> Result<()>;
}

impl<S: RenderSurface + ?Sized> RenderSurface for Box<S> {
    fn show(&mut self, window: WindowId, image: &RgbImage) -> Result<()> {
        (**self).show(window, image)
    }
}

/// Counts frames without rendering anything.
#[derive(Debug, Default)]
pub struct NullSurface {
    shown: HashMap<WindowId, u64>,
}

impl NullSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self, window: WindowId) -> u64 {
        self.shown.get(&window).copied().unwrap_or(0)
    }
}

impl RenderSurface for NullSurface {
    fn show(&mut self, window: WindowId, _image: &RgbImage) -> Result<()> {
        *self.shown.entry(window).or_insert(0) += 1;
        Ok(())
    }
}

/// Writes PNG snapshots to `<dir>/<window-slug>/<frame>.png`.
///
/// Only every `every`-th frame of each window is written, starting with the
/// first.
pub struct ImageDirSurface {
    root: PathBuf,
    every: u64,
    shown: HashMap<WindowId, u64>,
    written: u64,
}

impl ImageDirSurface {
    pub fn create(root: &Path, every: u64) -> Result<Self> {
        for window in WindowId::ALL {
            let dir = root.join(window.slug());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create snapshot directory {}", dir.display()))?;
        }
        log::info!(
            "writing snapshots to {} (every {} frame(s))",
            root.display(),
            every.max(1)
        );
        Ok(Self {
            root: root.to_path_buf(),
            every: every.max(1),
            shown: HashMap::new(),
            written: 0,
        })
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RenderSurface for ImageDirSurface {
    fn show(&mut self, window: WindowId, image: &RgbImage) -> Result<()> {
        let index = self.shown.entry(window).or_insert(0);
        let frame = *index;
        *index += 1;
        if frame % self.every != 0 {
            return Ok(());
        }
        let path = self
            .root
            .join(window.slug())
            .join(format!("{:06}.png", frame));
        image
            .save(&path)
            .with_context(|| format!("write snapshot {}", path.display()))?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_match_window_names() {
        assert_eq!(WindowId::Detection.title(), "Pedestrian Detection");
        assert_eq!(WindowId::Background.title(), "Background Subtracted");
    }

    #[test]
    fn null_surface_counts_per_window() -> Result<()> {
        let mut surface = NullSurface::new();
        let image = RgbImage::new(2, 2);
        surface.show(WindowId::Detection, &image)?;
        surface.show(WindowId::Detection, &image)?;
        surface.show(WindowId::Background, &image)?;
        assert_eq!(surface.shown(WindowId::Detection), 2);
        assert_eq!(surface.shown(WindowId::Background), 1);
        Ok(())
    }

    #[test]
    fn image_dir_writes_every_nth_frame() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut surface = ImageDirSurface::create(dir.path(), 2)?;
        let image = RgbImage::new(4, 4);
        for _ in 0..5 {
            surface.show(WindowId::Background, &image)?;
        }
        assert_eq!(surface.written(), 3);
        let background = dir.path().join("background");
        assert!(background.join("000000.png").exists());
        assert!(!background.join("000001.png").exists());
        assert!(background.join("000004.png").exists());
        assert!(dir.path().join("detection").is_dir());
        Ok(())
    }
}
