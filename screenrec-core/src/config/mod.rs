//! Configuration types for screenrec
//!
//! Provides encoder quality presets, recorder options and the config file.

mod file;

pub use file::{sample_config, ConfigFile, DisplaySettings, RecorderSettings, SyntheticSettings};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::encode::EncodingProfile;
use crate::types::Size;

/// Output quality preset for the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Keep the capture size
    Auto,
    /// 1920x1080
    Hd1080p,
    /// 1280x720
    #[default]
    Hd720p,
    /// 800x480
    Wvga,
    /// 720x480
    Ntsc,
    /// 720x576
    Pal,
    /// 640x480
    Vga,
    /// 320x240
    Qvga,
    /// 3840x2160
    Uhd2160p,
    /// 7680x4320
    Uhd4320p,
}

impl Quality {
    /// Largest output size for this preset, `None` for [`Quality::Auto`]
    pub fn resolution(&self) -> Option<Size> {
        let (width, height) = match self {
            Self::Auto => return None,
            Self::Hd1080p => (1920, 1080),
            Self::Hd720p => (1280, 720),
            Self::Wvga => (800, 480),
            Self::Ntsc => (720, 480),
            Self::Pal => (720, 576),
            Self::Vga => (640, 480),
            Self::Qvga => (320, 240),
            Self::Uhd2160p => (3840, 2160),
            Self::Uhd4320p => (7680, 4320),
        };
        Some(Size::new(width, height))
    }

    /// Get the preset name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Hd1080p => "1080p",
            Self::Hd720p => "720p",
            Self::Wvga => "wvga",
            Self::Ntsc => "ntsc",
            Self::Pal => "pal",
            Self::Vga => "vga",
            Self::Qvga => "qvga",
            Self::Uhd2160p => "2160p",
            Self::Uhd4320p => "4320p",
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "1080p" | "hd1080p" => Ok(Self::Hd1080p),
            "720p" | "hd720p" => Ok(Self::Hd720p),
            "wvga" => Ok(Self::Wvga),
            "ntsc" => Ok(Self::Ntsc),
            "pal" => Ok(Self::Pal),
            "vga" => Ok(Self::Vga),
            "qvga" => Ok(Self::Qvga),
            "2160p" | "4k" | "uhd2160p" => Ok(Self::Uhd2160p),
            "4320p" | "8k" | "uhd4320p" => Ok(Self::Uhd4320p),
            _ => Err(format!("Unknown quality: {}", s)),
        }
    }
}

/// Options for [`crate::ScreenRecorder::create`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderOptions {
    /// Encoder quality preset
    pub quality: Quality,
    /// Allow hardware encoders
    pub hardware_acceleration: bool,
    /// Display device name prefix; `None` selects the primary display
    pub monitor_device_name: Option<String>,
    /// Give up waiting for the pipeline on dispose after this long
    pub shutdown_timeout: Option<Duration>,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            quality: Quality::Hd720p,
            hardware_acceleration: true,
            monitor_device_name: None,
            shutdown_timeout: None,
        }
    }
}

impl RecorderOptions {
    /// Set the quality preset
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Enable or disable hardware acceleration
    pub fn with_hardware_acceleration(mut self, enabled: bool) -> Self {
        self.hardware_acceleration = enabled;
        self
    }

    /// Capture the display whose device name starts with `name`
    pub fn with_monitor(mut self, name: impl Into<String>) -> Self {
        self.monitor_device_name = Some(name.into());
        self
    }

    /// Bound the wait for the pipeline on dispose
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Encoder profile derived from these options
    pub fn profile(&self) -> EncodingProfile {
        EncodingProfile {
            quality: self.quality,
            hardware_acceleration: self.hardware_acceleration,
        }
    }
}
