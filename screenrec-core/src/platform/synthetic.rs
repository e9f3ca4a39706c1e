//! Software platform with virtual displays
//!
//! Pairs synthetic capture sessions with the YUV4MPEG2 pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{DeviceHandle, GraphicsDevice, Platform};
use crate::capture::{self, CaptureSession, SyntheticSession};
use crate::config::SyntheticSettings;
use crate::encode::{EncodingProfile, OutputSink, PreparedPipeline, Y4mPipeline};
use crate::error::{RecorderError, Result};
use crate::types::{CaptureTarget, Size, VideoStreamDescriptor};

/// CPU "device" backing synthetic surfaces
#[derive(Debug)]
pub struct SoftwareDevice {
    name: String,
    released: AtomicBool,
}

impl SoftwareDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            released: AtomicBool::new(false),
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl GraphicsDevice for SoftwareDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            warn!("Device {} released twice", self.name);
        } else {
            debug!("Device {} released", self.name);
        }
    }
}

/// Platform made of virtual displays and a software encoder
#[derive(Debug, Clone)]
pub struct SyntheticPlatform {
    displays: Vec<CaptureTarget>,
    frame_rate: u32,
    close_after: Option<Duration>,
}

impl SyntheticPlatform {
    /// Create a platform from explicit displays
    pub fn new(displays: Vec<CaptureTarget>, frame_rate: u32) -> Self {
        Self {
            displays,
            frame_rate,
            close_after: None,
        }
    }

    /// Create a platform from the `[synthetic]` config section
    pub fn from_settings(settings: &SyntheticSettings) -> Self {
        let displays = settings
            .displays
            .iter()
            .map(|d| {
                CaptureTarget::new(d.name.clone(), Size::new(d.width, d.height))
                    .with_primary(d.primary)
            })
            .collect();

        let mut platform = Self::new(displays, settings.frame_rate);
        if settings.close_after_secs > 0 {
            platform = platform.with_close_after(Duration::from_secs(settings.close_after_secs));
        }
        platform
    }

    /// Remove the captured display this long after capture starts
    pub fn with_close_after(mut self, after: Duration) -> Self {
        self.close_after = Some(after);
        self
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Displays available for capture
    pub fn list_displays(&self) -> &[CaptureTarget] {
        &self.displays
    }
}

impl Default for SyntheticPlatform {
    fn default() -> Self {
        Self::from_settings(&SyntheticSettings::default())
    }
}

impl Platform for SyntheticPlatform {
    fn acquire_device(&self) -> Result<DeviceHandle> {
        if self.displays.is_empty() {
            return Err(RecorderError::device("No virtual displays configured"));
        }
        info!("Acquired software device");
        Ok(Arc::new(SoftwareDevice::new("software")))
    }

    fn resolve_capture_target(&self, selector: Option<&str>) -> Result<CaptureTarget> {
        capture::resolve_target(&self.displays, selector)
    }

    fn create_capture_session(
        &self,
        device: &DeviceHandle,
        target: &CaptureTarget,
        buffer_depth: usize,
    ) -> Result<Box<dyn CaptureSession>> {
        debug!("Creating capture session for {} on {}", target, device.name());
        let session =
            SyntheticSession::new(target.clone(), self.frame_rate, buffer_depth, self.close_after)?;
        Ok(Box::new(session))
    }

    fn prepare_pipeline(
        &self,
        _device: &DeviceHandle,
        stream: &VideoStreamDescriptor,
        sink: OutputSink,
        profile: &EncodingProfile,
    ) -> Result<Box<dyn PreparedPipeline>> {
        let pipeline = Y4mPipeline::prepare(stream, sink, profile, self.frame_rate)?;
        Ok(Box::new(pipeline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplaySettings;

    #[test]
    fn test_from_settings() {
        let settings = SyntheticSettings {
            frame_rate: 60,
            close_after_secs: 2,
            displays: vec![DisplaySettings {
                name: "VIRTUAL-9".into(),
                width: 800,
                height: 600,
                primary: true,
            }],
        };

        let platform = SyntheticPlatform::from_settings(&settings);
        assert_eq!(platform.frame_rate(), 60);
        assert_eq!(platform.close_after, Some(Duration::from_secs(2)));
        assert_eq!(platform.list_displays()[0].size, Size::new(800, 600));
        assert!(platform.list_displays()[0].primary);
    }

    #[test]
    fn test_no_displays_fails_device_acquisition() {
        let platform = SyntheticPlatform::new(Vec::new(), 30);
        assert!(matches!(
            platform.acquire_device(),
            Err(RecorderError::Device(_))
        ));
    }

    #[test]
    fn test_device_release_is_tracked() {
        let device = SoftwareDevice::new("test");
        assert!(!device.is_released());
        device.release();
        assert!(device.is_released());
    }
}
