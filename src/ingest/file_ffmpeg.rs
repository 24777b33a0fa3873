//! Video file decoding using FFmpeg.
//!
//! Frames keep the stream's native resolution. Packets from other streams are
//! skipped; at the end of the file the decoder is drained before reporting
//! end of stream.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;

pub(crate) struct FfmpegFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    flushed: bool,
}

impl FfmpegFileSource {
    pub(crate) fn open(path: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open video '{}' with ffmpeg", path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        log::info!(
            "FileSource: opened {} ({}x{}, ffmpeg)",
            path,
            decoder.width(),
            decoder.height()
        );
        Ok(Self {
            path: path.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            flushed: false,
        })
    }

    /// Decode the next frame; `None` once the file is exhausted.
    pub(crate) fn next_image(&mut self) -> Result<Option<RgbImage>> {
        let mut decoded = ffmpeg::frame::Video::empty();

        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return self.convert(&decoded).map(Some);
        }

        while !self.flushed {
            match self.input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    self.decoder
                        .send_packet(&packet)
                        .context("send packet to ffmpeg decoder")?;
                }
                None => {
                    self.decoder.send_eof().context("flush ffmpeg decoder")?;
                    self.flushed = true;
                }
            }
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded).map(Some);
            }
        }

        log::info!("FileSource: end of {}", self.path);
        Ok(None)
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<RgbImage> {
        let mut rgb = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb)
            .context("scale frame to RGB")?;
        packed_rgb(&rgb)
    }
}

/// Copy an RGB24 frame into an image, dropping per-row stride padding.
fn packed_rgb(frame: &ffmpeg::frame::Video) -> Result<RgbImage> {
    let (width, height) = (frame.width(), frame.height());
    let row_len = width as usize * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut image = RgbImage::new(width, height);
    for (y, dst) in image.chunks_exact_mut(row_len.max(1)).enumerate() {
        let start = y * stride;
        let src = data
            .get(start..start + row_len)
            .with_context(|| format!("decoded row {} is out of bounds", y))?;
        dst.copy_from_slice(src);
    }
    Ok(image)
}
