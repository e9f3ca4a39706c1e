//! Encoding pipelines
//!
//! This module provides:
//! - The contract between the recorder and an asynchronous encoding pipeline
//! - A software YUV4MPEG2 pipeline that pulls frames through the bridge

mod scaler;
mod y4m;

pub use scaler::{calculate_scaled_size, FrameScaler};
pub use y4m::Y4mPipeline;

use std::io::Write;

use crate::config::Quality;
use crate::deferral::{SampleRequest, StartRequest};
use crate::error::Result;

/// Writable byte sink the encoded stream goes to. Opened and closed by the caller.
pub type OutputSink = Box<dyn Write + Send>;

/// Invoked once when the pipeline wants the stream origin
pub type StartingHandler = Box<dyn Fn(StartRequest) + Send + Sync>;

/// Invoked every time the pipeline wants another sample
pub type SampleRequestedHandler = Box<dyn Fn(SampleRequest) + Send + Sync>;

/// Invoked exactly once with the overall outcome of the transcode
pub type CompletionHandler = Box<dyn FnOnce(Result<()>) + Send>;

/// Encoder settings requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingProfile {
    /// Output quality preset
    pub quality: Quality,
    /// Allow hardware encoders
    pub hardware_acceleration: bool,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            hardware_acceleration: true,
        }
    }
}

/// A pipeline that accepted its stream parameters and output sink.
///
/// Hooks are registered before [`PreparedPipeline::transcode`]; the pipeline
/// never invokes them earlier.
pub trait PreparedPipeline: Send {
    /// Register the stream-starting hook
    fn on_starting(&mut self, handler: StartingHandler);

    /// Register the sample-requested hook
    fn on_sample_requested(&mut self, handler: SampleRequestedHandler);

    /// Begin transcoding in the background.
    ///
    /// `on_complete` runs exactly once, on any thread, after the pipeline has
    /// stopped pulling samples. Failures to begin are reported through it too.
    fn transcode(self: Box<Self>, on_complete: CompletionHandler);
}
