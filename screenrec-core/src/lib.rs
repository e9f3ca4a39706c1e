//! Screenrec Core Library
//!
//! Display recording built around a single-slot frame rendezvous.
//!
//! This library provides:
//! - A frame bridge between a push-based capture session and a pull-based encoder
//! - A recorder that owns the device, session and pipeline and tears them down in order
//! - A synthetic platform (test-pattern capture, YUV4MPEG2 encoder) for headless use
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐ frame  ┌──────────────┐ sample ┌─────────────────┐
//! │ Capture Session │───────▶│ Frame Bridge │◀──────▶│ Encoding        │
//! │ (own thread)    │        │ (1 slot)     │request │ Pipeline        │
//! └─────────────────┘        └──────────────┘        └────────┬────────┘
//!          ▲                                                  │ bytes
//!          └──────────── Screen Recorder (lifecycle) ─────────▼ Output sink
//! ```

pub mod bridge;
pub mod capture;
pub mod config;
pub mod deferral;
pub mod encode;
pub mod error;
pub mod platform;
pub mod recorder;
pub mod types;

pub use bridge::{BridgeState, BridgeStats, FrameBridge};
pub use capture::CaptureSession;
pub use config::{ConfigFile, Quality, RecorderOptions};
pub use deferral::{SampleRequest, SampleResponse, StartRequest, StartResponse};
pub use encode::{EncodingProfile, OutputSink, PreparedPipeline};
pub use error::{ErrorKind, RecorderError, Result};
pub use platform::{DeviceHandle, GraphicsDevice, Platform, SyntheticPlatform};
pub use recorder::{RecorderState, RecorderStats, ScreenRecorder};
pub use types::{CaptureTarget, Frame, Handle, MemorySurface, Size, Surface, VideoStreamDescriptor};
