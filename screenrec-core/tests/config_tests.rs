//! Integration tests for configuration system

use std::time::Duration;

use screenrec_core::config::{sample_config, ConfigFile, DisplaySettings, Quality, RecorderOptions};
use screenrec_core::error::ErrorKind;
use screenrec_core::SyntheticPlatform;
use tempfile::TempDir;

#[test]
fn test_quality_resolution() {
    assert_eq!(Quality::Auto.resolution(), None);
    let hd = Quality::Hd1080p.resolution().unwrap();
    assert_eq!((hd.width, hd.height), (1920, 1080));
    let vga = Quality::Vga.resolution().unwrap();
    assert_eq!((vga.width, vga.height), (640, 480));
    let uhd = Quality::Uhd2160p.resolution().unwrap();
    assert_eq!((uhd.width, uhd.height), (3840, 2160));
}

#[test]
fn test_quality_from_string() {
    assert_eq!("1080p".parse::<Quality>(), Ok(Quality::Hd1080p));
    assert_eq!("HD720P".parse::<Quality>(), Ok(Quality::Hd720p));
    assert_eq!("4k".parse::<Quality>(), Ok(Quality::Uhd2160p));
    assert_eq!("pal".parse::<Quality>(), Ok(Quality::Pal));
    assert!("1440p".parse::<Quality>().is_err());
}

#[test]
fn test_options_builder() {
    let options = RecorderOptions::default()
        .with_quality(Quality::Vga)
        .with_hardware_acceleration(false)
        .with_monitor("\\\\.\\DISPLAY2")
        .with_shutdown_timeout(Duration::from_secs(5));

    assert_eq!(options.quality, Quality::Vga);
    assert!(!options.hardware_acceleration);
    assert_eq!(options.monitor_device_name.as_deref(), Some("\\\\.\\DISPLAY2"));
    assert_eq!(options.shutdown_timeout, Some(Duration::from_secs(5)));

    let profile = options.profile();
    assert_eq!(profile.quality, Quality::Vga);
    assert!(!profile.hardware_acceleration);
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config = ConfigFile::load_from(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.recorder.quality, Quality::Hd720p);
    assert_eq!(config.synthetic.displays.len(), 2);
}

#[test]
fn test_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = ConfigFile::default();
    config.recorder.quality = Quality::Hd1080p;
    config.recorder.monitor = "VIRTUAL-2".into();
    config.recorder.shutdown_timeout_secs = 3;
    config.synthetic.frame_rate = 60;
    config.save_to(path.clone()).unwrap();

    let loaded = ConfigFile::load_from(path).unwrap();
    assert_eq!(loaded.recorder.quality, Quality::Hd1080p);
    assert_eq!(loaded.synthetic.frame_rate, 60);

    let options = loaded.recorder_options();
    assert_eq!(options.monitor_device_name.as_deref(), Some("VIRTUAL-2"));
    assert_eq!(options.shutdown_timeout, Some(Duration::from_secs(3)));
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[recorder]\nquality = \"vga\"\n").unwrap();

    let config = ConfigFile::load_from(path).unwrap();
    assert_eq!(config.recorder.quality, Quality::Vga);
    assert!(config.recorder.hardware_acceleration);
    assert_eq!(config.recorder.output, "recording.y4m");
    assert_eq!(config.synthetic.frame_rate, 30);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[recorder\nquality = ").unwrap();

    let err = ConfigFile::load_from(path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_unknown_quality_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[recorder]\nquality = \"1440p\"\n").unwrap();

    assert!(ConfigFile::load_from(path).is_err());
}

#[test]
fn test_validation() {
    let mut config = ConfigFile::default();
    config.synthetic.frame_rate = 0;
    assert!(config.validate().is_err());

    let mut config = ConfigFile::default();
    config.synthetic.displays.push(DisplaySettings {
        name: "VIRTUAL-3".into(),
        width: 0,
        height: 600,
        primary: false,
    });
    assert!(config.validate().is_err());

    let mut config = ConfigFile::default();
    for display in &mut config.synthetic.displays {
        display.primary = true;
    }
    assert!(config.validate().is_err());
}

#[test]
fn test_sample_config_builds_platform() {
    let config: ConfigFile = toml::from_str(&sample_config()).unwrap();
    let platform = SyntheticPlatform::from_settings(&config.synthetic);

    assert_eq!(platform.frame_rate(), 30);
    let names: Vec<_> = platform.list_displays().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["VIRTUAL-1", "VIRTUAL-2"]);
    assert!(platform.list_displays()[0].primary);
}
