//! Local file frame source.
//!
//! A path may name:
//! - a still image (one frame, then end of stream)
//! - a directory of image frames (read in file-name order)
//! - a video file (decoded with FFmpeg, feature: ingest-file-ffmpeg)
//!
//! Only local paths are accepted; URL schemes are rejected up front.

use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::FrameSource;
use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Local file frame source.
pub struct FileSource {
    path: String,
    backend: FileBackend,
    frames_captured: u64,
}

enum FileBackend {
    Still(Option<RgbImage>),
    Sequence { files: Vec<PathBuf>, next: usize },
    #[cfg(feature = "ingest-file-ffmpeg")]
    Video(FfmpegFileSource),
}

impl FileSource {
    pub fn open(path: &str) -> Result<Self> {
        if !is_local_file_path(path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        let fs_path = Path::new(path);
        if !fs_path.exists() {
            bail!("{} does not exist", path);
        }

        let backend = if fs_path.is_dir() {
            let files = image_files_in(fs_path)?;
            if files.is_empty() {
                bail!("{} contains no image frames", path);
            }
            log::info!("FileSource: {} frames in {}", files.len(), path);
            FileBackend::Sequence { files, next: 0 }
        } else if is_image_file(fs_path) {
            FileBackend::Still(Some(load_rgb(fs_path)?))
        } else {
            open_video(path)?
        };

        Ok(Self {
            path: path.to_string(),
            backend,
            frames_captured: 0,
        })
    }
}

impl FrameSource for FileSource {
    fn describe(&self) -> String {
        self.path.clone()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let image = match &mut self.backend {
            FileBackend::Still(image) => image.take(),
            FileBackend::Sequence { files, next } => match files.get(*next) {
                Some(file) => {
                    *next += 1;
                    Some(load_rgb(file)?)
                }
                None => None,
            },
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Video(source) => source.next_image()?,
        };
        if image.is_some() {
            self.frames_captured += 1;
        }
        Ok(image.map(Frame::new))
    }

    fn frames_captured(&self) -> u64 {
        self.frames_captured
    }
}

#[cfg(feature = "ingest-file-ffmpeg")]
fn open_video(path: &str) -> Result<FileBackend> {
    Ok(FileBackend::Video(FfmpegFileSource::open(path)?))
}

#[cfg(not(feature = "ingest-file-ffmpeg"))]
fn open_video(_path: &str) -> Result<FileBackend> {
    bail!("video decoding requires the ingest-file-ffmpeg feature")
}

fn load_rgb(path: &Path) -> Result<RgbImage> {
    let image = image::open(path).with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(image.to_rgb8())
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn image_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_local_file_path(path: &str) -> bool {
    !path.trim().is_empty() && !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_png(path: &Path, shade: u8) -> Result<()> {
        RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade])).save(path)?;
        Ok(())
    }

    #[test]
    fn rejects_urls_and_empty_paths() {
        assert!(FileSource::open("").is_err());
        assert!(FileSource::open("http://example.com/clip.mp4").is_err());
    }

    #[test]
    fn still_image_yields_one_frame() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("still.png");
        write_png(&path, 40)?;

        let mut source = FileSource::open(path.to_str().context("utf-8 path")?)?;
        let frame = source.next_frame()?.context("first frame")?;
        assert_eq!((frame.width(), frame.height()), (8, 6));
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.frames_captured(), 1);
        Ok(())
    }

    #[test]
    fn directory_frames_play_in_name_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_png(&dir.path().join("frame_002.png"), 20)?;
        write_png(&dir.path().join("frame_001.png"), 10)?;
        std::fs::write(dir.path().join("notes.txt"), "not a frame")?;

        let mut source = FileSource::open(dir.path().to_str().context("utf-8 path")?)?;
        let mut shades = Vec::new();
        while let Some(frame) = source.next_frame()? {
            shades.push(frame.image().get_pixel(0, 0)[0]);
        }
        assert_eq!(shades, vec![10, 20]);
        Ok(())
    }

    #[test]
    fn empty_directory_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(FileSource::open(dir.path().to_str().context("utf-8 path")?).is_err());
        Ok(())
    }

    #[cfg(not(feature = "ingest-file-ffmpeg"))]
    #[test]
    fn video_needs_ffmpeg_feature() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"\0\0\0\x18ftypmp42")?;
        let err = match FileSource::open(path.to_str().context("utf-8 path")?) {
            Ok(_) => panic!("video should need ffmpeg"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("ingest-file-ffmpeg"));
        Ok(())
    }
}
