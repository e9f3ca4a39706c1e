//! Mock infrastructure for testing
//!
//! Provides a scriptable platform: a counting device, a capture session the
//! test pushes frames through by hand, and an encoder that pulls samples on
//! its own thread and records what it got.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use screenrec_core::capture::{CaptureSession, ClosedHandler, FrameArrivedHandler};
use screenrec_core::encode::{
    CompletionHandler, EncodingProfile, OutputSink, PreparedPipeline, SampleRequestedHandler,
    StartingHandler,
};
use screenrec_core::error::{RecorderError, Result};
use screenrec_core::platform::{DeviceHandle, GraphicsDevice, Platform};
use screenrec_core::types::{CaptureTarget, Frame, Size, Surface, VideoStreamDescriptor};
use screenrec_core::{SampleRequest, StartRequest};

/// Everything the mocks observed
#[derive(Debug, Default)]
pub struct Counters {
    pub devices_acquired: AtomicUsize,
    pub devices_released: AtomicUsize,
    pub sessions_created: AtomicUsize,
    pub session_starts: AtomicUsize,
    pub session_stops: AtomicUsize,
    pub sessions_dropped: AtomicUsize,
    pub pipelines_prepared: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Poll `condition` until it holds or two seconds pass
pub fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Surface that counts how many times it was dropped
pub struct CountingSurface {
    size: Size,
    drops: Arc<AtomicUsize>,
}

impl Surface for CountingSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn pixels(&self) -> Option<&[u8]> {
        None
    }
}

impl Drop for CountingSurface {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Create a frame whose release is counted in `drops`
pub fn counted_frame(timestamp_ms: u64, drops: &Arc<AtomicUsize>) -> Frame {
    Frame::new(
        Duration::from_millis(timestamp_ms),
        CountingSurface {
            size: Size::new(4, 4),
            drops: drops.clone(),
        },
    )
}

/// In-memory sink that can be inspected after the writer is gone
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().clone()
    }

    pub fn sink(&self) -> OutputSink {
        Box::new(self.clone())
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Device that counts releases
pub struct MockDevice {
    counters: Arc<Counters>,
}

impl GraphicsDevice for MockDevice {
    fn name(&self) -> &str {
        "mock-gpu"
    }

    fn release(&self) {
        self.counters.devices_released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handlers a [`MockSession`] was given, reachable from the test
#[derive(Clone, Default)]
pub struct SessionHandles {
    frame: Arc<Mutex<Option<Arc<FrameArrivedHandler>>>>,
    closed: Arc<Mutex<Option<Arc<ClosedHandler>>>>,
}

impl SessionHandles {
    /// Deliver a frame as the capture thread would
    pub fn push(&self, frame: Frame) {
        let handler = self.frame.lock().clone();
        if let Some(handler) = handler {
            handler(frame);
        }
    }

    /// Report that the capture target went away
    pub fn close(&self) {
        let handler = self.closed.lock().clone();
        if let Some(handler) = handler {
            handler();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.frame.lock().is_some()
    }
}

/// Capture session driven by the test through [`SessionHandles`]
pub struct MockSession {
    handles: SessionHandles,
    counters: Arc<Counters>,
    fail_start: bool,
}

impl MockSession {
    pub fn new(counters: Arc<Counters>) -> (Self, SessionHandles) {
        let handles = SessionHandles::default();
        (Self::attached(counters, handles.clone()), handles)
    }

    /// Session whose handlers land in existing `handles`
    pub fn attached(counters: Arc<Counters>, handles: SessionHandles) -> Self {
        counters.sessions_created.fetch_add(1, Ordering::SeqCst);
        Self {
            handles,
            counters,
            fail_start: false,
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }
}

impl CaptureSession for MockSession {
    fn on_frame_arrived(&mut self, handler: FrameArrivedHandler) {
        *self.handles.frame.lock() = Some(Arc::new(handler));
    }

    fn on_closed(&mut self, handler: ClosedHandler) {
        *self.handles.closed.lock() = Some(Arc::new(handler));
    }

    fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(RecorderError::session("mock capture refused to start"));
        }
        self.counters.session_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.counters.session_stops.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.counters.sessions_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// What the mock encoder does once transcoding begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineScript {
    /// Pull samples until the bridge answers with none
    UntilEnd,
    /// Report a runtime failure after pulling this many samples
    FailAfter(usize),
}

/// What the mock encoder saw
#[derive(Debug, Default)]
pub struct PipelineLog {
    pub start: Mutex<Option<Duration>>,
    pub timestamps: Mutex<Vec<Duration>>,
}

/// Encoder that pulls through the hooks on its own thread
pub struct MockPipeline {
    sink: OutputSink,
    script: PipelineScript,
    log: Arc<PipelineLog>,
    gate: Option<mpsc::Receiver<()>>,
    starting: Option<StartingHandler>,
    sample_requested: Option<SampleRequestedHandler>,
}

impl PreparedPipeline for MockPipeline {
    fn on_starting(&mut self, handler: StartingHandler) {
        self.starting = Some(handler);
    }

    fn on_sample_requested(&mut self, handler: SampleRequestedHandler) {
        self.sample_requested = Some(handler);
    }

    fn transcode(self: Box<Self>, on_complete: CompletionHandler) {
        let MockPipeline {
            mut sink,
            script,
            log,
            gate,
            starting,
            sample_requested,
        } = *self;

        thread::spawn(move || {
            let (Some(starting), Some(sample_requested)) = (starting, sample_requested) else {
                on_complete(Err(RecorderError::runtime("hooks not registered")));
                return;
            };

            let (request, response) = StartRequest::new();
            starting(request);
            *log.start.lock() = Some(response.blocking_wait());

            let mut pulled = 0;
            let result = loop {
                if script == PipelineScript::FailAfter(pulled) {
                    break Err(RecorderError::runtime("mock encoder failure"));
                }

                let (request, response) = SampleRequest::new();
                sample_requested(request);
                match response.blocking_wait() {
                    Some(frame) => {
                        log.timestamps.lock().push(frame.timestamp());
                        let _ = writeln!(sink, "frame {}", frame.timestamp().as_millis());
                        pulled += 1;
                    }
                    None => break Ok(()),
                }
            };

            if let Some(gate) = gate {
                let _ = gate.recv();
            }
            on_complete(result);
        });
    }
}

/// Platform with scriptable failures
pub struct MockPlatform {
    pub counters: Arc<Counters>,
    pub log: Arc<PipelineLog>,
    displays: Vec<CaptureTarget>,
    fail_device: bool,
    fail_prepare: bool,
    fail_session_start: bool,
    script: PipelineScript,
    gate: Mutex<Option<mpsc::Receiver<()>>>,
    session: SessionHandles,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            log: Arc::new(PipelineLog::default()),
            displays: vec![
                CaptureTarget::new("\\\\.\\DISPLAY1", Size::new(1920, 1080)).with_primary(true),
                CaptureTarget::new("\\\\.\\DISPLAY2", Size::new(1280, 1024)),
            ],
            fail_device: false,
            fail_prepare: false,
            fail_session_start: false,
            script: PipelineScript::UntilEnd,
            gate: Mutex::new(None),
            session: SessionHandles::default(),
        }
    }

    pub fn failing_device(mut self) -> Self {
        self.fail_device = true;
        self
    }

    pub fn failing_prepare(mut self) -> Self {
        self.fail_prepare = true;
        self
    }

    pub fn failing_session_start(mut self) -> Self {
        self.fail_session_start = true;
        self
    }

    pub fn without_primary(mut self) -> Self {
        for display in &mut self.displays {
            display.primary = false;
        }
        self
    }

    pub fn with_script(mut self, script: PipelineScript) -> Self {
        self.script = script;
        self
    }

    /// Make the encoder wait for the returned sender before reporting completion
    pub fn hold_completion(&self) -> mpsc::Sender<()> {
        let (tx, rx) = mpsc::channel();
        *self.gate.lock() = Some(rx);
        tx
    }

    /// Handlers of the most recently created session
    pub fn session(&self) -> SessionHandles {
        self.session.clone()
    }

    /// Push frames with increasing timestamps from a background thread until
    /// the returned flag is set
    pub fn feed_frames(&self, drops: Arc<AtomicUsize>) -> (Arc<AtomicBool>, thread::JoinHandle<u64>) {
        let done = Arc::new(AtomicBool::new(false));
        let session = self.session();
        let flag = done.clone();
        let feeder = thread::spawn(move || {
            let mut timestamp = 0;
            while !flag.load(Ordering::SeqCst) {
                timestamp += 1;
                session.push(counted_frame(timestamp, &drops));
                thread::sleep(Duration::from_millis(1));
            }
            timestamp
        });
        (done, feeder)
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MockPlatform {
    fn acquire_device(&self) -> Result<DeviceHandle> {
        if self.fail_device {
            return Err(RecorderError::device("no adapter"));
        }
        self.counters.devices_acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockDevice {
            counters: self.counters.clone(),
        }))
    }

    fn resolve_capture_target(&self, selector: Option<&str>) -> Result<CaptureTarget> {
        screenrec_core::capture::resolve_target(&self.displays, selector)
    }

    fn create_capture_session(
        &self,
        _device: &DeviceHandle,
        _target: &CaptureTarget,
        _buffer_depth: usize,
    ) -> Result<Box<dyn CaptureSession>> {
        *self.session.frame.lock() = None;
        *self.session.closed.lock() = None;
        let mut session = MockSession::attached(self.counters.clone(), self.session.clone());
        session.fail_start = self.fail_session_start;
        Ok(Box::new(session))
    }

    fn prepare_pipeline(
        &self,
        _device: &DeviceHandle,
        stream: &VideoStreamDescriptor,
        sink: OutputSink,
        _profile: &EncodingProfile,
    ) -> Result<Box<dyn PreparedPipeline>> {
        if self.fail_prepare {
            return Err(RecorderError::prepare(format!(
                "mock encoder rejects {}",
                stream.size
            )));
        }
        self.counters.pipelines_prepared.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPipeline {
            sink,
            script: self.script,
            log: self.log.clone(),
            gate: self.gate.lock().take(),
            starting: None,
            sample_requested: None,
        }))
    }
}
