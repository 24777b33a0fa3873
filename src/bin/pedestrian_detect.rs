//! pedestrian_detect - live pedestrian detection with a background-subtracted view
//!
//! This tool:
//! 1. Opens a camera, image, image directory, video file or stub:// scene
//! 2. Detects people in every frame with the active detector mode
//! 3. Renders the annotated frame and the background-subtracted canvas
//! 4. Quits on 'q'/<ESC>/Ctrl-C; <space> toggles Default/Daimler detection
//!
//! Exit status: 0 on success or --help, 1 on flag/configuration errors,
//! 2 when the frame source cannot be opened.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use hog_pedestrian::{
    build_detector, open_source, AppConfig, CanvasBounds, Compositor, ConfigOverrides,
    DetectionLoop, FramePacer, FrameSource, ImageDirSurface, KeySource, NullSurface,
    RenderSurface, SourceUnavailable, StopReason, TerminalKeys,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "pedestrian_detect",
    about = "This sample demonstrates pedestrian detection with HOG descriptors."
)]
struct Args {
    /// Capture video from camera (device index starting from 0; needs the ingest-v4l2 build feature)
    #[arg(short = 'c', long, value_name = "INDEX")]
    camera: Option<u32>,

    /// Use video as input (image, image directory, video file or stub:// scene)
    #[arg(short = 'v', long, value_name = "PATH")]
    video: Option<String>,

    /// JSON configuration file (defaults to $PEDESTRIAN_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write PNG snapshots of both windows under this directory
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Snapshot every N-th frame
    #[arg(long, value_name = "N")]
    snapshot_every: Option<u64>,

    /// Target cycle rate
    #[arg(long, value_name = "FPS")]
    fps: Option<u32>,

    /// Trained weights for the Default (64x128) detector
    #[arg(long, value_name = "PATH")]
    default_model: Option<PathBuf>,

    /// Trained weights for the Daimler (48x96) detector
    #[arg(long, value_name = "PATH")]
    daimler_model: Option<PathBuf>,

    /// How adjusted boxes select the canvas pixels to copy
    #[arg(long, value_enum, value_name = "MODE")]
    canvas_bounds: Option<CanvasBounds>,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    max_frames: Option<u64>,

    /// Never open live windows, even when a display is available
    #[arg(long)]
    headless: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            camera: self.camera,
            video: self.video.clone(),
            default_model: self.default_model.clone(),
            daimler_model: self.daimler_model.clone(),
            canvas_bounds: self.canvas_bounds,
            output_dir: self.output.clone(),
            snapshot_every: self.snapshot_every,
            target_fps: self.fps,
            max_frames: self.max_frames,
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(unavailable) = err.downcast_ref::<SourceUnavailable>() {
                eprintln!("Can not open video stream: {}", unavailable);
                return ExitCode::from(2);
            }
            eprintln!("error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let ui = ui::Ui::from_flag(&args.ui);

    let config = {
        let _stage = ui.stage("Load configuration");
        AppConfig::load(args.config.as_deref(), args.overrides())?
    };
    let source = {
        let _stage = ui.stage("Open frame source");
        open_source(&config.source())?
    };
    log::info!("reading frames from {}", source.describe());
    let detector = {
        let _stage = ui.stage("Load detector models");
        build_detector(&config.models)?
    };
    let (surface, keys) = outputs(&config, args.headless)?;

    println!("Press 'q' or <ESC> to quit.");
    println!("Press <space> to toggle between Default and Daimler detector");

    let mut detection = DetectionLoop::new(source, detector, surface, keys)
        .with_compositor(Compositor::new(config.canvas_bounds))
        .with_pacer(FramePacer::from_fps(config.target_fps))
        .with_max_frames(config.max_frames);

    let mut meter = ui.cycle_meter();
    let summary = detection.run_with(|report| meter.record(report))?;
    match summary.stopped_by {
        StopReason::EndOfStream => println!("Finished reading: empty frame"),
        StopReason::Quit => println!("Exit requested"),
        StopReason::FrameLimit => {}
    }
    meter.finish(&summary);
    Ok(())
}

type Outputs = (Box<dyn RenderSurface>, Box<dyn KeySource>);

/// Snapshots when an output directory is set, otherwise live windows when
/// built with them and a display is reachable, otherwise nothing.
fn outputs(config: &AppConfig, headless: bool) -> Result<Outputs> {
    if let Some(dir) = &config.output.dir {
        let surface = ImageDirSurface::create(dir, config.output.snapshot_every)?;
        return Ok((Box::new(surface), terminal_keys()?));
    }
    if !headless {
        if let Some(windowed) = live_windows()? {
            return Ok(windowed);
        }
    }
    log::info!("no display or output directory; windows are not rendered");
    Ok((Box::new(NullSurface::new()), terminal_keys()?))
}

fn terminal_keys() -> Result<Box<dyn KeySource>> {
    let keys = TerminalKeys::spawn()?;
    keys.quit_on_ctrlc()?;
    Ok(Box::new(keys))
}

#[cfg(feature = "display-highgui")]
fn live_windows() -> Result<Option<Outputs>> {
    use hog_pedestrian::highgui::{display_available, HighguiKeys, HighguiWindows};

    if !display_available() {
        return Ok(None);
    }
    let keys = HighguiKeys::new();
    keys.quit_on_ctrlc()?;
    Ok(Some((Box::new(HighguiWindows::new()), Box::new(keys))))
}

#[cfg(not(feature = "display-highgui"))]
fn live_windows() -> Result<Option<Outputs>> {
    Ok(None)
}
