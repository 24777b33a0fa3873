//! The display/input loop.
//!
//! One cycle: pace, acquire a frame, reset the canvas, detect on the frame
//! and on the blank canvas, composite, show both windows, poll one key.
//! A quit key ends the loop after the cycle it was read in; a toggle key
//! switches the detector mode for the next cycle.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use crate::compose::Compositor;
use crate::detect::{DetectionBox, DetectorMode, MultiScaleDetector};
use crate::display::{RenderSurface, WindowId};
use crate::frame::Canvas;
use crate::ingest::FrameSource;
use crate::input::{Key, KeySource};
use crate::pacing::FramePacer;

/// What happened in one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    /// 1-based frame number.
    pub frame_index: u64,
    /// Mode the cycle detected with.
    pub mode: DetectorMode,
    /// Raw boxes found on the frame.
    pub boxes: Vec<DetectionBox>,
    /// Boxes found on the blank canvas; reported, never drawn.
    pub canvas_detections: usize,
    pub pixels_copied: u64,
    pub detect_time: Duration,
    /// Mode selected by a toggle key read at the end of the cycle.
    pub toggled_to: Option<DetectorMode>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    Continue(CycleReport),
    /// Quit key read; the cycle itself completed.
    Quit(CycleReport),
    EndOfStream,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Quit,
    FrameLimit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoopSummary {
    pub frames: u64,
    pub total_boxes: u64,
    pub mode_switches: u64,
    pub final_mode: DetectorMode,
    pub stopped_by: StopReason,
}

pub struct DetectionLoop<R: RenderSurface, K: KeySource> {
    source: Box<dyn FrameSource>,
    detector: MultiScaleDetector,
    compositor: Compositor,
    canvas: Canvas,
    surface: R,
    keys: K,
    pacer: FramePacer,
    max_frames: Option<u64>,
    frames: u64,
}

impl<R: RenderSurface, K: KeySource> DetectionLoop<R, K> {
    pub fn new(source: Box<dyn FrameSource>, detector: MultiScaleDetector, surface: R, keys: K) -> Self {
        Self {
            source,
            detector,
            compositor: Compositor::default(),
            canvas: Canvas::new(),
            surface,
            keys,
            pacer: FramePacer::default(),
            max_frames: None,
            frames: 0,
        }
    }

    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = compositor;
        self
    }

    pub fn with_pacer(mut self, pacer: FramePacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Stop after `max` frames.
    pub fn with_max_frames(mut self, max: Option<u64>) -> Self {
        self.max_frames = max;
        self
    }

    pub fn detector(&self) -> &MultiScaleDetector {
        &self.detector
    }

    /// Canvas of the most recent cycle.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn surface(&self) -> &R {
        &self.surface
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one cycle.
    pub fn step(&mut self) -> Result<CycleOutcome> {
        self.pacer.wait();

        let next = self
            .source
            .next_frame()
            .with_context(|| format!("read frame from {}", self.source.describe()))?;
        let Some(mut frame) = next else {
            log::info!(
                "end of stream from {} after {} frame(s)",
                self.source.describe(),
                self.frames
            );
            return Ok(CycleOutcome::EndOfStream);
        };
        self.frames += 1;

        self.canvas.reset_for(&frame);
        let mode = self.detector.mode();
        let started = Instant::now();
        let boxes = self.detector.detect(frame.image())?;
        let canvas_boxes = self.detector.detect(self.canvas.image())?;
        let detect_time = started.elapsed();

        let stats = self.compositor.compose(&mut frame, &mut self.canvas, &boxes);
        self.surface
            .show(WindowId::Detection, frame.image())
            .context("show detection window")?;
        self.surface
            .show(WindowId::Background, self.canvas.image())
            .context("show background window")?;

        let mut report = CycleReport {
            frame_index: self.frames,
            mode,
            boxes,
            canvas_detections: canvas_boxes.len(),
            pixels_copied: stats.pixels_copied,
            detect_time,
            toggled_to: None,
        };
        log::debug!(
            "frame {}: {} box(es) [{}], {} px copied, detect {:?}",
            report.frame_index,
            report.boxes.len(),
            mode,
            report.pixels_copied,
            detect_time
        );

        match self.keys.poll_key(Duration::ZERO)? {
            Some(Key::Quit) => {
                log::info!("quit requested at frame {}", self.frames);
                return Ok(CycleOutcome::Quit(report));
            }
            Some(Key::ToggleMode) => {
                report.toggled_to = Some(self.detector.toggle_mode());
            }
            Some(Key::Other(c)) => log::debug!("ignoring key {:?}", c),
            None => {}
        }
        Ok(CycleOutcome::Continue(report))
    }

    pub fn run(&mut self) -> Result<LoopSummary> {
        self.run_with(|_| {})
    }

    /// Run until end of stream, quit or the frame limit; `on_cycle` sees
    /// every completed cycle.
    pub fn run_with(&mut self, mut on_cycle: impl FnMut(&CycleReport)) -> Result<LoopSummary> {
        let mut total_boxes = 0u64;
        let mut mode_switches = 0u64;
        let stopped_by = loop {
            if self.max_frames.is_some_and(|max| self.frames >= max) {
                log::info!("frame limit of {} reached", self.frames);
                break StopReason::FrameLimit;
            }
            match self.step()? {
                CycleOutcome::Continue(report) => {
                    total_boxes += report.boxes.len() as u64;
                    mode_switches += report.toggled_to.is_some() as u64;
                    on_cycle(&report);
                }
                CycleOutcome::Quit(report) => {
                    total_boxes += report.boxes.len() as u64;
                    on_cycle(&report);
                    break StopReason::Quit;
                }
                CycleOutcome::EndOfStream => break StopReason::EndOfStream,
            }
        };
        Ok(LoopSummary {
            frames: self.frames,
            total_boxes,
            mode_switches,
            final_mode: self.detector.mode(),
            stopped_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{DetectorModel, HogLayout};
    use crate::display::NullSurface;
    use crate::ingest::SyntheticSource;
    use crate::input::ScriptedKeys;

    fn detector() -> MultiScaleDetector {
        MultiScaleDetector::from_models(
            DetectorModel::gradient_energy(HogLayout::default_people()).unwrap(),
            DetectorModel::gradient_energy(HogLayout::daimler_people()).unwrap(),
        )
    }

    fn blank_loop(frames: u64, keys: ScriptedKeys) -> DetectionLoop<NullSurface, ScriptedKeys> {
        let url = format!("stub://blank?frames={}&person=0&width=64&height=128", frames);
        let source = SyntheticSource::from_url(&url).unwrap();
        DetectionLoop::new(Box::new(source), detector(), NullSurface::new(), keys)
            .with_pacer(FramePacer::unpaced())
    }

    #[test]
    fn ends_gracefully_at_end_of_stream() -> Result<()> {
        let mut detection = blank_loop(3, ScriptedKeys::silent());
        let summary = detection.run()?;
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.stopped_by, StopReason::EndOfStream);
        assert_eq!(detection.surface().shown(WindowId::Detection), 3);
        assert_eq!(detection.surface().shown(WindowId::Background), 3);
        Ok(())
    }

    #[test]
    fn quit_stops_after_current_cycle() -> Result<()> {
        let mut detection = blank_loop(10, ScriptedKeys::new([None, Some(Key::Quit)]));
        let summary = detection.run()?;
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.stopped_by, StopReason::Quit);
        assert_eq!(detection.surface().shown(WindowId::Background), 2);
        Ok(())
    }

    #[test]
    fn toggle_applies_from_next_cycle() -> Result<()> {
        let mut detection = blank_loop(3, ScriptedKeys::new([Some(Key::ToggleMode)]));
        let modes: Vec<DetectorMode> = (0..3)
            .map(|_| match detection.step() {
                Ok(CycleOutcome::Continue(report)) => report.mode,
                other => panic!("unexpected outcome {:?}", other),
            })
            .collect();
        assert_eq!(
            modes,
            vec![DetectorMode::Default, DetectorMode::Daimler, DetectorMode::Daimler]
        );
        Ok(())
    }

    #[test]
    fn frame_limit_caps_the_run() -> Result<()> {
        let mut detection = blank_loop(10, ScriptedKeys::silent()).with_max_frames(Some(4));
        let summary = detection.run()?;
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.stopped_by, StopReason::FrameLimit);
        Ok(())
    }

    #[test]
    fn blank_frames_keep_canvas_black() -> Result<()> {
        let mut detection = blank_loop(2, ScriptedKeys::silent());
        while let CycleOutcome::Continue(report) = detection.step()? {
            assert!(report.boxes.is_empty());
            assert_eq!(report.pixels_copied, 0);
            assert!(detection.canvas().is_black());
        }
        Ok(())
    }
}
