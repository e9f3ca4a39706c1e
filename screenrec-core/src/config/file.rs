//! Configuration file loading and merging
//!
//! Loads user configuration from `~/.config/screenrec/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Quality, RecorderOptions};
use crate::error::{RecorderError, Result};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Recorder defaults
    #[serde(default)]
    pub recorder: RecorderSettings,

    /// Synthetic capture source
    #[serde(default)]
    pub synthetic: SyntheticSettings,
}

/// Default recorder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderSettings {
    /// Quality preset (auto, hd1080p, hd720p, vga, ...)
    #[serde(default)]
    pub quality: Quality,

    /// Allow hardware encoders
    #[serde(default = "default_true")]
    pub hardware_acceleration: bool,

    /// Display device name prefix (empty = primary display)
    #[serde(default)]
    pub monitor: String,

    /// Seconds to wait for the encoder on shutdown (0 = wait as long as it takes)
    #[serde(default)]
    pub shutdown_timeout_secs: u64,

    /// Default output file name
    #[serde(default = "default_output")]
    pub output: String,
}

/// Synthetic capture source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticSettings {
    /// Frames per second delivered by each display
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Remove the captured display after this many seconds (0 = never)
    #[serde(default)]
    pub close_after_secs: u64,

    /// Virtual displays
    #[serde(default = "default_displays")]
    pub displays: Vec<DisplaySettings>,
}

/// One virtual display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Device name
    pub name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Primary display flag
    #[serde(default)]
    pub primary: bool,
}

fn default_true() -> bool {
    true
}

fn default_output() -> String {
    "recording.y4m".to_string()
}

fn default_frame_rate() -> u32 {
    30
}

fn default_displays() -> Vec<DisplaySettings> {
    vec![
        DisplaySettings {
            name: "VIRTUAL-1".to_string(),
            width: 1920,
            height: 1080,
            primary: true,
        },
        DisplaySettings {
            name: "VIRTUAL-2".to_string(),
            width: 1280,
            height: 1024,
            primary: false,
        },
    ]
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            hardware_acceleration: true,
            monitor: String::new(),
            shutdown_timeout_secs: 0,
            output: default_output(),
        }
    }
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            close_after_secs: 0,
            displays: default_displays(),
        }
    }
}

impl RecorderSettings {
    /// Recorder options described by these settings
    pub fn options(&self) -> RecorderOptions {
        RecorderOptions {
            quality: self.quality,
            hardware_acceleration: self.hardware_acceleration,
            monitor_device_name: (!self.monitor.is_empty()).then(|| self.monitor.clone()),
            shutdown_timeout: (self.shutdown_timeout_secs > 0)
                .then(|| Duration::from_secs(self.shutdown_timeout_secs)),
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("screenrec").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("screenrec")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/screenrec/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| RecorderError::config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)?;
        config.validate()?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    RecorderError::config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)?;

        std::fs::write(&path, content)
            .map_err(|e| RecorderError::config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Reject settings the recorder cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.synthetic.frame_rate == 0 || self.synthetic.frame_rate > 240 {
            return Err(RecorderError::config(format!(
                "synthetic.frame_rate must be between 1 and 240, got {}",
                self.synthetic.frame_rate
            )));
        }

        for display in &self.synthetic.displays {
            if display.width == 0 || display.height == 0 {
                return Err(RecorderError::config(format!(
                    "Display {} has an empty size",
                    display.name
                )));
            }
        }

        let primaries = self.synthetic.displays.iter().filter(|d| d.primary).count();
        if primaries > 1 {
            return Err(RecorderError::config(
                "At most one synthetic display can be primary",
            ));
        }

        Ok(())
    }

    /// Recorder options from the `[recorder]` section
    pub fn recorder_options(&self) -> RecorderOptions {
        self.recorder.options()
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# screenrec configuration

[recorder]
# Quality preset: auto, hd1080p, hd720p, wvga, ntsc, pal, vga, qvga, uhd2160p, uhd4320p
quality = "hd720p"

# Allow hardware encoders when the pipeline supports them
hardware_acceleration = true

# Display device name prefix (empty = primary display)
monitor = ""

# Seconds to wait for the encoder on shutdown (0 = wait as long as it takes)
shutdown_timeout_secs = 0

# Default output file
output = "recording.y4m"

[synthetic]
# Frames per second delivered by the virtual displays
frame_rate = 30

# Remove the captured display after this many seconds (0 = never)
close_after_secs = 0

[[synthetic.displays]]
name = "VIRTUAL-1"
width = 1920
height = 1080
primary = true

[[synthetic.displays]]
name = "VIRTUAL-2"
width = 1280
height = 1024
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();
        assert_eq!(config.recorder.quality, Quality::Hd720p);
        assert_eq!(config.recorder.output, "recording.y4m");
        assert_eq!(config.synthetic.frame_rate, 30);
        assert_eq!(config.synthetic.displays.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = sample_config();
        let config: ConfigFile = toml::from_str(&sample).unwrap();
        assert_eq!(config.recorder.quality, Quality::Hd720p);
        assert_eq!(config.synthetic.displays[0].name, "VIRTUAL-1");
        assert!(config.synthetic.displays[0].primary);
        assert!(!config.synthetic.displays[1].primary);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_monitor_means_primary() {
        let options = RecorderSettings::default().options();
        assert!(options.monitor_device_name.is_none());
        assert!(options.shutdown_timeout.is_none());
    }
}
