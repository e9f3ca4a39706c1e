//! Synthetic capture session
//!
//! Renders an animated test pattern on its own delivery thread, the way a
//! compositor-backed session delivers frames. Useful for exercising the
//! recorder end to end without a real display server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, trace, warn};

use super::{CaptureSession, ClosedHandler, FrameArrivedHandler, FRAME_BUFFER_DEPTH};
use crate::error::{RecorderError, Result};
use crate::types::{CaptureTarget, Frame, MemorySurface, Size};

/// Reference point for system-relative frame timestamps
static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Time since the first capture in this process
pub fn system_relative_time() -> Duration {
    EPOCH.get_or_init(Instant::now).elapsed()
}

/// Shared state between the delivery thread and the session owner
struct SharedState {
    frame_handler: Mutex<Option<Arc<FrameArrivedHandler>>>,
    closed_handler: Mutex<Option<Arc<ClosedHandler>>>,
    /// Frames are delivered only while set
    capturing: AtomicBool,
    /// Delivery thread exits when set
    shutdown: AtomicBool,
    /// Wakes the delivery thread out of its pacing wait
    wake_lock: Mutex<()>,
    wake: Condvar,
}

impl SharedState {
    /// Sleep until `deadline` unless shutdown is requested first
    fn wait_until(&self, deadline: Instant) {
        let mut guard = self.wake_lock.lock();
        if !self.shutdown.load(Ordering::SeqCst) {
            let _ = self.wake.wait_until(&mut guard, deadline);
        }
    }

    fn request_shutdown(&self) {
        self.capturing.store(false, Ordering::SeqCst);
        self.shutdown.store(true, Ordering::SeqCst);
        let _guard = self.wake_lock.lock();
        self.wake.notify_all();
    }
}

/// Capture session over a virtual display
pub struct SyntheticSession {
    target: CaptureTarget,
    frame_rate: u32,
    close_after: Option<Duration>,
    shared: Arc<SharedState>,
    thread: Option<JoinHandle<()>>,
}

impl SyntheticSession {
    /// Create a session for `target`.
    ///
    /// `close_after` simulates the display being removed that long after
    /// capture starts.
    pub fn new(
        target: CaptureTarget,
        frame_rate: u32,
        buffer_depth: usize,
        close_after: Option<Duration>,
    ) -> Result<Self> {
        if frame_rate == 0 {
            return Err(RecorderError::session("Frame rate must be at least 1"));
        }
        if target.size.is_empty() {
            return Err(RecorderError::session(format!(
                "Display {} has an empty size",
                target.name
            )));
        }
        if buffer_depth != FRAME_BUFFER_DEPTH {
            debug!(
                "Buffer depth {} requested, synthetic sessions always hold one frame",
                buffer_depth
            );
        }

        Ok(Self {
            target,
            frame_rate,
            close_after,
            shared: Arc::new(SharedState {
                frame_handler: Mutex::new(None),
                closed_handler: Mutex::new(None),
                capturing: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
                wake_lock: Mutex::new(()),
                wake: Condvar::new(),
            }),
            thread: None,
        })
    }

    /// Whether frames are currently being delivered
    pub fn is_capturing(&self) -> bool {
        self.shared.capturing.load(Ordering::SeqCst)
    }
}

impl CaptureSession for SyntheticSession {
    fn on_frame_arrived(&mut self, handler: FrameArrivedHandler) {
        *self.shared.frame_handler.lock() = Some(Arc::new(handler));
    }

    fn on_closed(&mut self, handler: ClosedHandler) {
        *self.shared.closed_handler.lock() = Some(Arc::new(handler));
    }

    fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            self.shared.capturing.store(true, Ordering::SeqCst);
            return Ok(());
        }

        let shared = self.shared.clone();
        let size = self.target.size;
        let interval = Duration::from_secs(1) / self.frame_rate;
        let close_after = self.close_after;

        shared.capturing.store(true, Ordering::SeqCst);
        let thread = thread::Builder::new()
            .name(format!("capture-{}", self.target.name))
            .spawn(move || deliver_frames(shared, size, interval, close_after))
            .map_err(|e| {
                self.shared.capturing.store(false, Ordering::SeqCst);
                RecorderError::session(format!("Failed to spawn capture thread: {}", e))
            })?;

        info!("Capturing {} at {}fps", self.target, self.frame_rate);
        self.thread = Some(thread);
        Ok(())
    }

    fn stop(&mut self) {
        if self.shared.capturing.swap(false, Ordering::SeqCst) {
            debug!("Capture of {} stopped", self.target.name);
        }
    }
}

impl Drop for SyntheticSession {
    fn drop(&mut self) {
        self.shared.request_shutdown();

        if let Some(thread) = self.thread.take() {
            // The last owner can be the delivery thread itself
            if thread.thread().id() == thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                warn!("Capture thread for {} panicked", self.target.name);
            }
        }
    }
}

fn deliver_frames(
    shared: Arc<SharedState>,
    size: Size,
    interval: Duration,
    close_after: Option<Duration>,
) {
    let started = Instant::now();
    let mut next = started;
    let mut sequence: u64 = 0;

    while !shared.shutdown.load(Ordering::SeqCst) {
        if close_after.is_some_and(|after| started.elapsed() >= after) {
            info!("Synthetic display removed");
            shared.capturing.store(false, Ordering::SeqCst);
            let handler = shared.closed_handler.lock().clone();
            if let Some(handler) = handler {
                handler();
            }
            break;
        }

        if shared.capturing.load(Ordering::SeqCst) {
            let handler = shared.frame_handler.lock().clone();
            if let (Some(handler), Some(surface)) = (handler, render_pattern(size, sequence)) {
                let frame = Frame::new(system_relative_time(), surface);
                trace!("Delivering synthetic frame {}", sequence);
                handler(frame);
            }
            sequence += 1;
        }

        next += interval;
        let now = Instant::now();
        if next > now {
            shared.wait_until(next);
        } else {
            // Fell behind, skip ahead rather than bursting
            next = now;
        }
    }

    debug!("Capture thread exiting after {} frames", sequence);
}

/// Gradient background with a vertical bar sweeping across it
fn render_pattern(size: Size, sequence: u64) -> Option<MemorySurface> {
    let width = size.width as usize;
    let height = size.height as usize;
    let bar_width = (width / 16).max(1);
    let bar_x = (sequence as usize * 8) % width;

    let mut data = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        let g = (y * 255 / height.max(1)) as u8;
        for x in 0..width {
            let pixel = if x >= bar_x && x < bar_x + bar_width {
                [255, 255, 255, 255]
            } else {
                let r = (x * 255 / width.max(1)) as u8;
                [128, g, r, 255]
            };
            data.extend_from_slice(&pixel);
        }
    }

    MemorySurface::new(size, data)
}
