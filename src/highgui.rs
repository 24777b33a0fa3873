//! Live windows through OpenCV's highgui (feature: display-highgui).
//!
//! Both windows are redrawn when the loop polls for a key, since highgui
//! only processes window events inside `wait_key`.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use image::RgbImage;
use opencv::core::{Mat, Scalar, CV_8UC3};
use opencv::highgui;
use opencv::prelude::*;
use std::collections::HashSet;
use std::time::Duration;

use crate::display::{RenderSurface, WindowId};
use crate::input::{key_from_wait_code, Key, KeySource};

/// Whether a window system is reachable from this process.
pub fn display_available() -> bool {
    ["DISPLAY", "WAYLAND_DISPLAY"]
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
}

/// Shows each window in its own auto-sized highgui window.
#[derive(Default)]
pub struct HighguiWindows {
    opened: HashSet<WindowId>,
    bgr: Option<Mat>,
}

impl HighguiWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse one BGR buffer across frames of the same size.
    fn to_bgr(&mut self, image: &RgbImage) -> Result<&Mat> {
        let (cols, rows) = (image.width() as i32, image.height() as i32);
        let reuse = matches!(&self.bgr, Some(mat) if mat.rows() == rows && mat.cols() == cols);
        if !reuse {
            self.bgr = Some(Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(0.0))?);
        }
        let mat = self.bgr.as_mut().context("display buffer")?;
        let dst = mat.data_bytes_mut()?;
        for (out, px) in dst.chunks_exact_mut(3).zip(image.as_raw().chunks_exact(3)) {
            out.copy_from_slice(&[px[2], px[1], px[0]]);
        }
        Ok(mat)
    }
}

impl RenderSurface for HighguiWindows {
    fn show(&mut self, window: WindowId, image: &RgbImage) -> Result<()> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(());
        }
        if self.opened.insert(window) {
            highgui::named_window(window.title(), highgui::WINDOW_AUTOSIZE)
                .with_context(|| format!("open window '{}'", window.title()))?;
        }
        let mat = self.to_bgr(image)?;
        highgui::imshow(window.title(), mat)
            .with_context(|| format!("draw window '{}'", window.title()))?;
        Ok(())
    }
}

impl Drop for HighguiWindows {
    fn drop(&mut self) {
        if !self.opened.is_empty() {
            let _ = highgui::destroy_all_windows();
        }
    }
}

/// Keys pressed while a highgui window has focus, plus Ctrl-C.
pub struct HighguiKeys {
    tx: Sender<Key>,
    rx: Receiver<Key>,
}

impl HighguiKeys {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn quit_on_ctrlc(&self) -> Result<()> {
        let tx = self.tx.clone();
        ctrlc::set_handler(move || {
            let _ = tx.send(Key::Quit);
        })
        .context("install Ctrl-C handler")
    }
}

impl Default for HighguiKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for HighguiKeys {
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        if let Ok(key) = self.rx.try_recv() {
            return Ok(Some(key));
        }
        // zero would block until a key arrives
        let ms = timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
        let code = highgui::wait_key(ms).context("poll window keys")?;
        Ok(key_from_wait_code(code))
    }
}
