//! Frame bridge between push-style capture and pull-style encoding
//!
//! The capture session pushes frames whenever the compositor produces them;
//! the encoder pulls samples whenever it is ready for one. The bridge holds
//! at most one frame and at most one outstanding request of each kind, and
//! hands a frame straight to a waiting request when one is present.
//!
//! ```text
//! CaptureSession ──on_frame_arrived──▶ ┌────────────┐ ◀──generate── Encoder
//!                                      │ FrameBridge│
//!                ──on_closed─────────▶ └────────────┘ ◀──start─────
//! ```
//!
//! Every operation takes the same mutex. Nothing under the lock blocks: it
//! only inspects state, resolves requests and moves at most one frame.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::capture::CaptureSession;
use crate::deferral::{SampleRequest, StartRequest};
use crate::types::Frame;

/// Bridge lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BridgeState {
    /// Constructed, capture not started
    Created,
    /// Capture running, requests being served
    Started,
    /// Capture stopped, every request answered with "no sample"
    Stopped,
    /// Session released
    Disposed,
}

/// Frame accounting for one bridge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Frames delivered by the capture session
    pub frames_arrived: u64,
    /// Frames handed to the encoder
    pub frames_delivered: u64,
    /// Frames released without reaching the encoder
    pub frames_dropped: u64,
    /// Sample requests answered with "no sample"
    pub empty_samples: u64,
}

/// Single-slot rendezvous between a capture session and an encoder.
///
/// Cloning yields another handle to the same bridge.
#[derive(Clone)]
pub struct FrameBridge {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
}

struct Inner {
    state: BridgeState,
    start_request: Option<StartRequest>,
    sample_request: Option<SampleRequest>,
    buffered: Option<Frame>,
    session: Option<Box<dyn CaptureSession>>,
    stats: BridgeStats,
}

impl FrameBridge {
    /// Create a bridge that owns `session` and subscribes to its events.
    ///
    /// The session's callbacks hold only a weak reference, so the session
    /// never keeps the bridge alive.
    pub fn new(mut session: Box<dyn CaptureSession>) -> Self {
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: BridgeState::Created,
                start_request: None,
                sample_request: None,
                buffered: None,
                session: None,
                stats: BridgeStats::default(),
            }),
        });

        let weak: Weak<Shared> = Arc::downgrade(&shared);
        session.on_frame_arrived(Box::new(move |frame: Frame| match weak.upgrade() {
            Some(shared) => shared.on_frame_arrived(frame),
            None => drop(frame),
        }));

        let weak: Weak<Shared> = Arc::downgrade(&shared);
        session.on_closed(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                info!("Capture target closed, stopping frame bridge");
                shared.stop();
            }
        }));

        shared.inner.lock().session = Some(session);
        Self { shared }
    }

    /// Answer the encoder's start request and begin capturing.
    ///
    /// The request resolves with the timestamp of the first frame that
    /// arrives, or with zero if the bridge stops first. Calling this twice
    /// is a programming error.
    pub fn start(&self, request: StartRequest) {
        let mut inner = self.shared.inner.lock();
        debug_assert!(
            inner.state != BridgeState::Started,
            "FrameBridge::start called twice"
        );

        let state = inner.state;
        match state {
            BridgeState::Created => {
                inner.state = BridgeState::Started;
                inner.start_request = Some(request);

                let started = match inner.session.as_mut() {
                    Some(session) => session.start(),
                    None => Ok(()),
                };

                match started {
                    Ok(()) => info!("Frame bridge started"),
                    Err(e) => {
                        error!("Failed to start capture session: {}", e);
                        let released = inner.halt();
                        drop(inner);
                        drop(released);
                    }
                }
            }
            BridgeState::Started => {
                error!("Frame bridge already started, answering duplicate start request");
                request.complete(Duration::ZERO);
            }
            BridgeState::Stopped | BridgeState::Disposed => {
                debug!("Start requested after stop, answering with zero start position");
                request.complete(Duration::ZERO);
            }
        }
    }

    /// Deliver a captured frame. Called by the capture session.
    pub fn on_frame_arrived(&self, frame: Frame) {
        self.shared.on_frame_arrived(frame);
    }

    /// Answer a sample request from the encoder.
    ///
    /// Resolves immediately with the buffered frame if there is one, with
    /// "no sample" if the bridge is not running, and otherwise on the next
    /// frame arrival.
    pub fn generate(&self, request: SampleRequest) {
        let mut inner = self.shared.inner.lock();

        if inner.state != BridgeState::Started {
            inner.stats.empty_samples += 1;
            trace!("Sample requested while {:?}, answering with no sample", inner.state);
            request.complete(None);
            return;
        }

        if let Some(frame) = inner.buffered.take() {
            inner.stats.frames_delivered += 1;
            trace!("Handing buffered frame at {:?} to encoder", frame.timestamp());
            request.complete(Some(frame));
            return;
        }

        if let Some(previous) = inner.sample_request.replace(request) {
            warn!("Sample requested while another was outstanding, answering the older one");
            inner.stats.empty_samples += 1;
            previous.complete(None);
        }
    }

    /// Stop capturing and answer every outstanding request.
    ///
    /// No-op unless started. When this returns, no start or sample request
    /// is left pending.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Like [`FrameBridge::stop`], but also shuts a bridge that was never
    /// started, so a `start` arriving later answers zero instead of
    /// beginning capture.
    pub fn close(&self) {
        let released = {
            let mut inner = self.shared.inner.lock();
            if inner.state == BridgeState::Created {
                debug!("Frame bridge closed before start");
                inner.state = BridgeState::Stopped;
                None
            } else {
                inner.halt()
            }
        };
        drop(released);
    }

    /// Stop if needed and release the capture session. Idempotent.
    pub fn dispose(&self) {
        let (released, session) = {
            let mut inner = self.shared.inner.lock();
            if inner.state == BridgeState::Disposed {
                return;
            }

            let halted = inner.halt();
            let leftover = inner.buffered.take();
            if leftover.is_some() {
                inner.stats.frames_dropped += 1;
            }
            inner.state = BridgeState::Disposed;
            if let Some(frame) = halted.as_ref().or(leftover.as_ref()) {
                trace!("Releasing frame at {:?} on dispose", frame.timestamp());
            }
            (halted.or(leftover), inner.session.take())
        };

        // Releasing the session may wait for its delivery thread, which may
        // itself be waiting for the lock.
        drop(released);
        drop(session);
        debug!("Frame bridge disposed");
    }

    pub fn state(&self) -> BridgeState {
        self.shared.inner.lock().state
    }

    pub fn stats(&self) -> BridgeStats {
        self.shared.inner.lock().stats
    }

    /// Whether an unclaimed frame is waiting for a sample request
    pub fn has_buffered_frame(&self) -> bool {
        self.shared.inner.lock().buffered.is_some()
    }
}

impl std::fmt::Debug for FrameBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("FrameBridge")
            .field("state", &inner.state)
            .field("buffered", &inner.buffered.is_some())
            .field("stats", &inner.stats)
            .finish()
    }
}

impl Shared {
    fn on_frame_arrived(&self, frame: Frame) {
        let mut inner = self.inner.lock();
        inner.stats.frames_arrived += 1;

        if inner.state != BridgeState::Started {
            inner.stats.frames_dropped += 1;
            drop(inner);
            drop(frame);
            return;
        }

        if let Some(request) = inner.start_request.take() {
            debug!("First frame arrived, stream origin {:?}", frame.timestamp());
            request.complete(frame.timestamp());
        }

        if let Some(request) = inner.sample_request.take() {
            inner.stats.frames_delivered += 1;
            trace!("Handing frame at {:?} to waiting encoder", frame.timestamp());
            request.complete(Some(frame));
            return;
        }

        let replaced = inner.buffered.replace(frame);
        if replaced.is_some() {
            inner.stats.frames_dropped += 1;
        }
        drop(inner);

        if let Some(old) = replaced {
            trace!("Dropping unclaimed frame at {:?}", old.timestamp());
        }
    }

    fn stop(&self) {
        let released = self.inner.lock().halt();
        drop(released);
    }
}

impl Inner {
    /// Move from `Started` to `Stopped`, answering every outstanding request.
    ///
    /// Returns the buffered frame so the caller can release it after
    /// unlocking.
    fn halt(&mut self) -> Option<Frame> {
        if self.state != BridgeState::Started {
            return None;
        }

        self.state = BridgeState::Stopped;
        if let Some(session) = self.session.as_mut() {
            session.stop();
        }

        if let Some(request) = self.start_request.take() {
            request.complete(Duration::ZERO);
        }

        if let Some(request) = self.sample_request.take() {
            self.stats.empty_samples += 1;
            request.complete(None);
        }

        let released = self.buffered.take();
        if released.is_some() {
            self.stats.frames_dropped += 1;
        }

        info!(
            "Frame bridge stopped - {} arrived, {} delivered, {} dropped",
            self.stats.frames_arrived, self.stats.frames_delivered, self.stats.frames_dropped
        );
        released
    }
}
