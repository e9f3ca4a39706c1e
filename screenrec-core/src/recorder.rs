//! Recorder lifecycle
//!
//! Owns the graphics device, the frame bridge (and through it the capture
//! session) and the running encoding pipeline.
//!
//! Creation order: device → capture target → capture session → bridge →
//! prepared pipeline → transcode. Anything acquired before a failure is
//! released before the error is returned.
//!
//! Shutdown order: stop the bridge (unblocks the encoder) → wait for the
//! pipeline to report completion → release the session → release the
//! device. The device release happens even when the pipeline failed.

use std::thread;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::bridge::{BridgeState, BridgeStats, FrameBridge};
use crate::capture::FRAME_BUFFER_DEPTH;
use crate::config::RecorderOptions;
use crate::deferral::{SampleRequest, StartRequest};
use crate::encode::OutputSink;
use crate::error::{RecorderError, Result, ResultExt};
use crate::platform::{DeviceHandle, Platform};
use crate::types::{CaptureTarget, Handle, VideoStreamDescriptor};

/// Recorder lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// Resources acquired, transcode not yet running
    Created,
    /// Transcode running
    Running,
    /// Dispose in progress, waiting for the pipeline
    ShuttingDown,
    /// Everything released (or handed to background teardown)
    Disposed,
}

/// Outcome of the transcode as reported by the pipeline
type Outcome = std::result::Result<Result<()>, oneshot::error::RecvError>;

/// Releases the device exactly once, on request or on drop
struct DeviceGuard {
    device: Option<DeviceHandle>,
}

impl DeviceGuard {
    fn new(device: DeviceHandle) -> Self {
        Self {
            device: Some(device),
        }
    }

    fn release(&mut self) {
        if let Some(device) = self.device.take() {
            debug!("Releasing device {}", device.name());
            device.release();
        }
    }

    /// Move the device out, leaving this guard empty
    fn take(&mut self) -> DeviceGuard {
        DeviceGuard {
            device: self.device.take(),
        }
    }
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// A live screen recording
pub struct ScreenRecorder {
    handle: Handle,
    state: RecorderState,
    target: CaptureTarget,
    bridge: FrameBridge,
    device: DeviceGuard,
    outcome: Option<oneshot::Receiver<Result<()>>>,
    finished: watch::Receiver<bool>,
    shutdown_timeout: Option<Duration>,
}

impl ScreenRecorder {
    /// Start recording the selected display into `output`.
    ///
    /// Returns once the pipeline is transcoding. Device, target, session and
    /// encoder failures are returned here with everything already released.
    pub fn create(
        platform: &dyn Platform,
        output: OutputSink,
        options: &RecorderOptions,
    ) -> Result<Self> {
        let handle = Handle::new();
        let device = platform.acquire_device()?;
        let mut guard = DeviceGuard::new(device.clone());

        let target = platform.resolve_capture_target(options.monitor_device_name.as_deref())?;
        let stream = VideoStreamDescriptor::for_target(&target);

        let session = platform
            .create_capture_session(&device, &target, FRAME_BUFFER_DEPTH)
            .context(format!("Failed to create capture session for {}", target.name))?;
        let bridge = FrameBridge::new(session);

        let mut pipeline =
            match platform.prepare_pipeline(&device, &stream, output, &options.profile()) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    error!("{}: encoder rejected {} ({}): {}", handle, target, options.quality, e);
                    bridge.dispose();
                    guard.release();
                    return Err(e);
                }
            };

        let starting = bridge.clone();
        pipeline.on_starting(Box::new(move |request: StartRequest| starting.start(request)));
        let sampling = bridge.clone();
        pipeline.on_sample_requested(Box::new(move |request: SampleRequest| {
            sampling.generate(request)
        }));

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (finished_tx, finished_rx) = watch::channel(false);
        let mut recorder = Self {
            handle,
            state: RecorderState::Created,
            target,
            bridge: bridge.clone(),
            device: guard,
            outcome: Some(outcome_rx),
            finished: finished_rx,
            shutdown_timeout: options.shutdown_timeout,
        };

        pipeline.transcode(Box::new(move |result: Result<()>| {
            match &result {
                Ok(()) => info!("{}: pipeline finished", handle),
                Err(e) => error!("{}: pipeline failed: {}", handle, e),
            }
            // Nobody pulls samples any more
            bridge.stop();
            let _ = outcome_tx.send(result);
            finished_tx.send_replace(true);
        }));

        recorder.state = RecorderState::Running;
        info!(
            "{}: recording {} at {} (hardware acceleration {})",
            handle,
            recorder.target,
            options.quality,
            if options.hardware_acceleration { "on" } else { "off" }
        );

        Ok(recorder)
    }

    /// Stop recording and release everything.
    ///
    /// Waits for the pipeline without a deadline unless a shutdown timeout
    /// was configured. A pipeline failure captured while recording is
    /// returned here. The device is released in every case. Calling this
    /// again after it returned is a no-op.
    pub async fn dispose(&mut self) -> Result<()> {
        if self.state == RecorderState::Disposed {
            return Ok(());
        }
        self.begin_shutdown();

        let Some(outcome) = self.outcome.as_mut() else {
            return self.complete_shutdown(Ok(Ok(())));
        };

        let outcome = match self.shutdown_timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, outcome).await;
                match waited {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(
                            "{}: pipeline did not stop within {:?}, finishing teardown in the background",
                            self.handle, limit
                        );
                        self.defer_release();
                        return Err(RecorderError::ShutdownTimeout(limit));
                    }
                }
            }
            None => outcome.await,
        };

        self.outcome = None;
        self.complete_shutdown(outcome)
    }

    /// [`ScreenRecorder::dispose`] for callers outside an async runtime.
    ///
    /// Panics if called from within a runtime.
    pub fn dispose_blocking(&mut self) -> Result<()> {
        if self.state == RecorderState::Disposed {
            return Ok(());
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        runtime.block_on(self.dispose())
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// The display being recorded
    pub fn target(&self) -> &CaptureTarget {
        &self.target
    }

    /// Watch that flips to `true` once the pipeline has finished on its own
    /// or after [`ScreenRecorder::dispose`] stopped it
    pub fn finished(&self) -> watch::Receiver<bool> {
        self.finished.clone()
    }

    pub fn is_finished(&self) -> bool {
        *self.finished.borrow()
    }

    /// Get recorder statistics
    pub fn stats(&self) -> RecorderStats {
        RecorderStats {
            handle: self.handle,
            state: self.state,
            target: self.target.name.clone(),
            bridge_state: self.bridge.state(),
            frames: self.bridge.stats(),
        }
    }

    fn begin_shutdown(&mut self) {
        if self.state != RecorderState::ShuttingDown {
            info!("{}: stopping", self.handle);
            self.state = RecorderState::ShuttingDown;
        }
        // The pipeline may not have asked for the origin yet
        self.bridge.close();
    }

    fn complete_shutdown(&mut self, outcome: Outcome) -> Result<()> {
        self.bridge.dispose();
        self.device.release();
        self.state = RecorderState::Disposed;

        let stats = self.bridge.stats();
        info!(
            "{}: disposed - {} frames delivered, {} dropped",
            self.handle, stats.frames_delivered, stats.frames_dropped
        );

        match outcome {
            Ok(result) => result,
            Err(_) => Err(RecorderError::runtime(
                "Pipeline went away without reporting completion",
            )),
        }
    }

    /// Hand the remaining teardown to whoever finishes last: this thread if
    /// the pipeline is already done, a background thread otherwise.
    fn defer_release(&mut self) {
        self.state = RecorderState::Disposed;
        let bridge = self.bridge.clone();
        let mut device = self.device.take();

        let Some(mut outcome) = self.outcome.take() else {
            bridge.dispose();
            device.release();
            return;
        };

        match outcome.try_recv() {
            Ok(Err(e)) => {
                warn!("{}: pipeline failed, nobody is waiting for the outcome: {}", self.handle, e);
                bridge.dispose();
                device.release();
            }
            Ok(Ok(())) | Err(oneshot::error::TryRecvError::Closed) => {
                bridge.dispose();
                device.release();
            }
            Err(oneshot::error::TryRecvError::Empty) => {
                let handle = self.handle;
                let spawned = thread::Builder::new()
                    .name("recorder-teardown".into())
                    .spawn(move || {
                        if let Ok(Err(e)) = outcome.blocking_recv() {
                            warn!("{}: pipeline failed during background teardown: {}", handle, e);
                        }
                        bridge.dispose();
                        device.release();
                        debug!("{}: background teardown complete", handle);
                    });

                if let Err(e) = spawned {
                    error!(
                        "{}: failed to spawn teardown thread ({}), releasing device early",
                        self.handle, e
                    );
                }
            }
        }
    }
}

impl Drop for ScreenRecorder {
    fn drop(&mut self) {
        if self.state == RecorderState::Disposed {
            return;
        }

        warn!("{}: dropped without dispose", self.handle);
        self.bridge.close();
        self.defer_release();
    }
}

impl std::fmt::Debug for ScreenRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenRecorder")
            .field("handle", &self.handle)
            .field("state", &self.state)
            .field("target", &self.target)
            .field("bridge", &self.bridge)
            .finish()
    }
}

/// Recorder statistics
#[derive(Debug, Clone)]
pub struct RecorderStats {
    /// Recorder handle
    pub handle: Handle,
    /// Recorder state
    pub state: RecorderState,
    /// Captured display
    pub target: String,
    /// Frame bridge state
    pub bridge_state: BridgeState,
    /// Frame accounting
    pub frames: BridgeStats,
}

impl std::fmt::Display for RecorderStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Recorder {}: {:?} ({:?}) - {}: {} frames captured, {} encoded, {} dropped, {} empty samples",
            self.handle,
            self.state,
            self.bridge_state,
            self.target,
            self.frames.frames_arrived,
            self.frames.frames_delivered,
            self.frames.frames_dropped,
            self.frames.empty_samples
        )
    }
}
