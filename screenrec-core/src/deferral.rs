//! One-shot completion handles
//!
//! The encoding pipeline asks for work by handing the bridge a request and
//! then waiting on the paired response. A request is resolved at most once;
//! a request that is dropped without being resolved still wakes its waiter,
//! which then sees the neutral answer (zero start position, no sample).

use std::time::Duration;
use tokio::sync::oneshot;

use crate::types::Frame;

/// Producer side of a one-shot completion
#[derive(Debug)]
pub struct Deferral<T> {
    tx: Option<oneshot::Sender<T>>,
}

/// Consumer side of a one-shot completion
#[derive(Debug)]
pub struct Deferred<T> {
    rx: oneshot::Receiver<T>,
}

/// Non-blocking view of a [`Deferred`]
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution<T> {
    /// Not resolved yet
    Pending,
    /// Resolved with a value
    Completed(T),
    /// Producer went away without resolving, or the value was already taken
    Abandoned,
}

/// Create a linked producer/consumer pair
pub fn deferral<T>() -> (Deferral<T>, Deferred<T>) {
    let (tx, rx) = oneshot::channel();
    (Deferral { tx: Some(tx) }, Deferred { rx })
}

impl<T> Deferral<T> {
    /// Resolve with `value`.
    ///
    /// Returns `false` (and drops `value`) if already resolved. A waiter that
    /// has gone away is not an error; the value is simply dropped.
    pub fn complete(&mut self, value: T) -> bool {
        match self.tx.take() {
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.tx.is_none()
    }
}

impl<T> Deferred<T> {
    /// Wait for the producer. `None` if it was dropped unresolved.
    pub async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }

    /// Block the current thread until resolved.
    ///
    /// Must not be called from inside an async runtime.
    pub fn blocking_wait(self) -> Option<T> {
        self.rx.blocking_recv().ok()
    }

    /// Take the value if it is already there
    pub fn try_take(&mut self) -> Resolution<T> {
        match self.rx.try_recv() {
            Ok(value) => Resolution::Completed(value),
            Err(oneshot::error::TryRecvError::Empty) => Resolution::Pending,
            Err(oneshot::error::TryRecvError::Closed) => Resolution::Abandoned,
        }
    }
}

/// Request for the stream's actual start position
#[derive(Debug)]
pub struct StartRequest {
    deferral: Deferral<Duration>,
}

/// Waiter for a [`StartRequest`]
#[derive(Debug)]
pub struct StartResponse {
    inner: Deferred<Duration>,
}

impl StartRequest {
    /// Create a request and the response the encoder waits on
    pub fn new() -> (Self, StartResponse) {
        let (deferral, inner) = deferral();
        (Self { deferral }, StartResponse { inner })
    }

    /// Resolve with the timestamp the stream should treat as its origin
    pub fn complete(mut self, actual_start: Duration) {
        self.deferral.complete(actual_start);
    }
}

impl StartResponse {
    /// Actual start position; zero if the request was abandoned
    pub async fn wait(self) -> Duration {
        self.inner.wait().await.unwrap_or(Duration::ZERO)
    }

    /// Blocking variant of [`StartResponse::wait`]
    pub fn blocking_wait(self) -> Duration {
        self.inner.blocking_wait().unwrap_or(Duration::ZERO)
    }

    pub fn try_take(&mut self) -> Resolution<Duration> {
        self.inner.try_take()
    }
}

/// Request for the next video sample
#[derive(Debug)]
pub struct SampleRequest {
    deferral: Deferral<Option<Frame>>,
}

/// Waiter for a [`SampleRequest`]
#[derive(Debug)]
pub struct SampleResponse {
    inner: Deferred<Option<Frame>>,
}

impl SampleRequest {
    /// Create a request and the response the encoder waits on
    pub fn new() -> (Self, SampleResponse) {
        let (deferral, inner) = deferral();
        (Self { deferral }, SampleResponse { inner })
    }

    /// Resolve with a frame, or `None` for end of stream
    pub fn complete(mut self, sample: Option<Frame>) {
        self.deferral.complete(sample);
    }
}

impl SampleResponse {
    /// Next frame; `None` means no more samples
    pub async fn wait(self) -> Option<Frame> {
        self.inner.wait().await.flatten()
    }

    /// Blocking variant of [`SampleResponse::wait`]
    pub fn blocking_wait(self) -> Option<Frame> {
        self.inner.blocking_wait().flatten()
    }

    /// `Completed(None)` is an explicit "no sample"
    pub fn try_take(&mut self) -> Resolution<Option<Frame>> {
        self.inner.try_take()
    }
}
