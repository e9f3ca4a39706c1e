//! Platform services the recorder depends on
//!
//! The recorder never talks to a graphics API, display server or encoder
//! directly. It goes through [`Platform`], which hands out the device, the
//! capture target, the capture session and the prepared encoding pipeline.

mod synthetic;

pub use synthetic::{SoftwareDevice, SyntheticPlatform};

use std::sync::Arc;

use crate::capture::CaptureSession;
use crate::encode::{EncodingProfile, OutputSink, PreparedPipeline};
use crate::error::Result;
use crate::types::{CaptureTarget, VideoStreamDescriptor};

/// Graphics device shared by capture and encoding.
///
/// Neither side mutates it. The recorder calls [`GraphicsDevice::release`]
/// exactly once, after both sides have been torn down.
pub trait GraphicsDevice: Send + Sync {
    /// Adapter or device name for logs
    fn name(&self) -> &str;

    /// Give the device back to the driver
    fn release(&self);
}

/// Shared handle to the recorder's device
pub type DeviceHandle = Arc<dyn GraphicsDevice>;

/// External collaborators of the recorder
pub trait Platform: Send + Sync {
    /// Acquire the graphics device
    fn acquire_device(&self) -> Result<DeviceHandle>;

    /// Resolve a display selector; `None` means the primary display
    fn resolve_capture_target(&self, selector: Option<&str>) -> Result<CaptureTarget>;

    /// Create a capture session for `target` on `device`
    fn create_capture_session(
        &self,
        device: &DeviceHandle,
        target: &CaptureTarget,
        buffer_depth: usize,
    ) -> Result<Box<dyn CaptureSession>>;

    /// Prepare an encoding pipeline writing to `sink`
    fn prepare_pipeline(
        &self,
        device: &DeviceHandle,
        stream: &VideoStreamDescriptor,
        sink: OutputSink,
        profile: &EncodingProfile,
    ) -> Result<Box<dyn PreparedPipeline>>;
}
