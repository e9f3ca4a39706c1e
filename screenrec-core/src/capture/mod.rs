//! Screen capture sessions
//!
//! This module handles:
//! - The capture session contract the frame bridge drives
//! - Display enumeration and a synthetic test-pattern session

pub mod synthetic;

pub use synthetic::SyntheticSession;

use tracing::debug;

use crate::error::{RecorderError, Result};
use crate::types::{CaptureTarget, Frame};

/// Buffer depth requested from capture sessions. Only the newest frame matters.
pub const FRAME_BUFFER_DEPTH: usize = 1;

/// Called on the session's delivery thread for every captured frame
pub type FrameArrivedHandler = Box<dyn Fn(Frame) + Send + Sync>;

/// Called when the capture target goes away (e.g. display removed)
pub type ClosedHandler = Box<dyn Fn() + Send + Sync>;

/// A running capture of one target.
///
/// `start` and `stop` are invoked while the frame bridge holds its lock, so
/// they must only signal the session and never wait on the delivery thread.
/// Dropping the session releases it; that may block until delivery ends.
pub trait CaptureSession: Send {
    /// Register the frame callback. Replaces any previous handler.
    fn on_frame_arrived(&mut self, handler: FrameArrivedHandler);

    /// Register the target-closed callback. Replaces any previous handler.
    fn on_closed(&mut self, handler: ClosedHandler);

    /// Begin delivering frames
    fn start(&mut self) -> Result<()>;

    /// Stop delivering frames
    fn stop(&mut self);
}

/// Pick the display to capture.
///
/// `None` selects the primary display; a name selects the first display whose
/// device name starts with it.
pub fn resolve_target(displays: &[CaptureTarget], selector: Option<&str>) -> Result<CaptureTarget> {
    let found = match selector {
        Some(name) => displays.iter().find(|d| d.name.starts_with(name)),
        None => displays.iter().find(|d| d.primary),
    };

    match (found, selector) {
        (Some(target), _) => {
            debug!("Resolved capture target {}", target);
            Ok(target.clone())
        }
        (None, Some(name)) => Err(RecorderError::target_not_found(format!(
            "Could not find display which has device name {}.",
            name
        ))),
        (None, None) => Err(RecorderError::target_not_found(
            "Could not find primary display.",
        )),
    }
}
