use std::sync::Mutex;

use tempfile::NamedTempFile;

use hog_pedestrian::config::{AppConfig, ConfigOverrides};
use hog_pedestrian::{CanvasBounds, SourceSelector};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PEDESTRIAN_CONFIG",
        "PEDESTRIAN_VIDEO",
        "PEDESTRIAN_CAMERA",
        "PEDESTRIAN_TARGET_FPS",
        "PEDESTRIAN_OUTPUT_DIR",
        "PEDESTRIAN_DEFAULT_MODEL",
        "PEDESTRIAN_DAIMLER_MODEL",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "source": { "camera": 1 },
            "detector": {
                "default_model": "models/people.json",
                "canvas_bounds": "end-coordinates"
            },
            "output": { "dir": "snapshots", "snapshot_every": 5 },
            "target_fps": 15
        }"#,
    );
    std::env::set_var("PEDESTRIAN_CONFIG", file.path());
    std::env::set_var("PEDESTRIAN_TARGET_FPS", "20");
    std::env::set_var("PEDESTRIAN_DAIMLER_MODEL", "models/daimler.json");

    let cfg = AppConfig::load(None, ConfigOverrides::default()).expect("load config");
    clear_env();

    assert_eq!(cfg.source(), SourceSelector::Camera(1));
    assert_eq!(cfg.target_fps, 20);
    assert_eq!(cfg.canvas_bounds, CanvasBounds::EndCoordinates);
    assert_eq!(cfg.output.snapshot_every, 5);
    assert_eq!(cfg.output.dir.as_deref(), Some(std::path::Path::new("snapshots")));
    assert_eq!(
        cfg.models.default.as_deref(),
        Some(std::path::Path::new("models/people.json"))
    );
    assert_eq!(
        cfg.models.daimler.as_deref(),
        Some(std::path::Path::new("models/daimler.json"))
    );
}

#[test]
fn command_line_overrides_win_over_file_and_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{ "source": { "video": "clip.mp4" }, "target_fps": 10 }"#);
    std::env::set_var("PEDESTRIAN_TARGET_FPS", "12");

    let overrides = ConfigOverrides {
        video: Some("stub://walk?frames=3".into()),
        target_fps: Some(25),
        max_frames: Some(3),
        ..ConfigOverrides::default()
    };
    let cfg = AppConfig::load(Some(file.path()), overrides).expect("load config");
    clear_env();

    assert_eq!(cfg.source(), SourceSelector::Video("stub://walk?frames=3".into()));
    assert_eq!(cfg.target_fps, 25);
    assert_eq!(cfg.max_frames, Some(3));
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{ "target_fps": 0 }"#);
    assert!(AppConfig::load(Some(file.path()), ConfigOverrides::default()).is_err());

    std::env::set_var("PEDESTRIAN_CAMERA", "front");
    let err = AppConfig::load(None, ConfigOverrides::default()).unwrap_err();
    clear_env();
    assert!(err.to_string().contains("PEDESTRIAN_CAMERA"));

    let file = write_config(r#"{ "source": { "device": "/dev/video0" } }"#);
    assert!(AppConfig::load(Some(file.path()), ConfigOverrides::default()).is_err());
}
