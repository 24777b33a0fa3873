use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::{Duration, Instant};

use hog_pedestrian::pipeline::{CycleReport, LoopSummary};

/// Plain-mode status lines are printed once per this many frames.
const PLAIN_STATUS_EVERY: u64 = 30;

/// Stderr presentation: spinners on a terminal, plain lines otherwise.
#[derive(Clone, Copy, Debug)]
pub struct Ui {
    pretty: bool,
}

impl Ui {
    /// `--ui auto|plain|pretty`. Spinners need a terminal on stderr; `auto`
    /// also stays plain when stdout is redirected.
    pub fn from_flag(flag: &str) -> Self {
        let stderr_tty = std::io::stderr().is_terminal();
        let pretty = match flag {
            "pretty" => stderr_tty,
            "plain" => false,
            _ => stderr_tty && std::io::stdout().is_terminal(),
        };
        Self { pretty }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.pretty {
            let spinner = spinner("{spinner} {msg}");
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Live per-cycle status: frames, boxes, mode and detection rate.
    pub fn cycle_meter(&self) -> CycleMeter {
        let spinner = self
            .pretty
            .then(|| spinner("{spinner} [{elapsed_precise}] {msg}"));
        CycleMeter {
            spinner,
            frames: 0,
            boxes: 0,
            detect_time: Duration::ZERO,
        }
    }
}

fn spinner(template: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    spinner.enable_steady_tick(Duration::from_millis(120));
    let style =
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

pub struct CycleMeter {
    spinner: Option<ProgressBar>,
    frames: u64,
    boxes: u64,
    detect_time: Duration,
}

impl CycleMeter {
    pub fn record(&mut self, report: &CycleReport) {
        self.frames += 1;
        self.boxes += report.boxes.len() as u64;
        self.detect_time += report.detect_time;

        let mut status = format!(
            "frame {} | {} box(es) | mode {} | {:.1} detect fps",
            report.frame_index,
            report.boxes.len(),
            report.toggled_to.unwrap_or(report.mode),
            self.detect_fps()
        );
        if let Some(mode) = report.toggled_to {
            status.push_str(&format!(" | switched to {mode}"));
        }
        match &self.spinner {
            Some(spinner) => spinner.set_message(status),
            None if report.toggled_to.is_some() || self.frames % PLAIN_STATUS_EVERY == 1 => {
                eprintln!("    {status}")
            }
            None => {}
        }
    }

    fn detect_fps(&self) -> f64 {
        let secs = self.detect_time.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }

    pub fn finish(self, summary: &LoopSummary) {
        let message = format!(
            "✔ {} frame(s), {} box(es), {} mode switch(es), stopped by {:?} ({})",
            summary.frames,
            summary.total_boxes,
            summary.mode_switches,
            summary.stopped_by,
            format_duration(self.detect_time)
        );
        match self.spinner {
            Some(spinner) => spinner.finish_with_message(message),
            None => eprintln!("{message}"),
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
