//! V4L2 camera source.
//!
//! Device index `n` opens `/dev/video{n}`. The source asks for RGB24 and
//! falls back to whatever the driver offers; YUYV and NV12 buffers are
//! converted to RGB before they leave this module.

use anyhow::{bail, Context, Result};
use ouroboros::self_referencing;

use super::normalize::PixelFormat;
use super::FrameSource;
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Requested frame rate; 0 leaves the driver default.
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl CameraConfig {
    pub fn for_index(index: u32) -> Self {
        Self {
            device: format!("/dev/video{}", index),
            ..Self::default()
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

#[self_referencing]
struct CameraStream {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

pub struct CameraSource {
    config: CameraConfig,
    stream: CameraStream,
    format: PixelFormat,
    width: u32,
    height: u32,
    frames_captured: u64,
}

impl CameraSource {
    pub fn open(config: CameraConfig) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&config.device)
            .with_context(|| format!("open v4l2 device {}", config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };
        let pixel_format = match &format.fourcc.repr {
            b"RGB3" => PixelFormat::Rgb24,
            b"YUYV" => PixelFormat::Yuyv,
            b"NV12" => PixelFormat::Nv12,
            other => bail!(
                "{} delivers unsupported pixel format {}",
                config.device,
                String::from_utf8_lossy(other)
            ),
        };

        if config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    config.device,
                    err
                );
            }
        }

        let stream = CameraStreamBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "CameraSource: connected to {} ({}x{}, {:?})",
            config.device,
            format.width,
            format.height,
            pixel_format
        );
        Ok(Self {
            config,
            stream,
            format: pixel_format,
            width: format.width,
            height: format.height,
            frames_captured: 0,
        })
    }
}

impl FrameSource for CameraSource {
    fn describe(&self) -> String {
        self.config.device.clone()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let (width, height, format) = (self.width, self.height, self.format);
        let frame = self.stream.with_mut(|fields| -> Result<Frame> {
            let (buf, meta) = fields.stream.next().context("capture v4l2 frame")?;
            let used = (meta.bytesused as usize).min(buf.len());
            let used = if used == 0 { buf.len() } else { used };
            Frame::from_raw(&buf[..used], width, height, format)
        })?;
        self.frames_captured += 1;
        Ok(Some(frame))
    }

    fn frames_captured(&self) -> u64 {
        self.frames_captured
    }
}
