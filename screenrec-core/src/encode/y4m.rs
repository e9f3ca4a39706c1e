//! Software encoding pipeline writing YUV4MPEG2
//!
//! Pulls frames through the start/sample hooks on its own thread, scales
//! them to the requested quality and writes 4:4:4 planar YUV. Gaps between
//! frame timestamps are filled by repeating the previous frame so playback
//! keeps wall-clock timing.

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::{
    calculate_scaled_size, CompletionHandler, EncodingProfile, FrameScaler, OutputSink,
    PreparedPipeline, SampleRequestedHandler, StartingHandler,
};
use crate::deferral::{SampleRequest, StartRequest};
use crate::error::{RecorderError, Result};
use crate::types::{Frame, Size, VideoStreamDescriptor};

/// Longest gap (in frames) filled by repeating the previous frame
const MAX_REPEAT_SECONDS: u64 = 1;

/// Prepared YUV4MPEG2 pipeline
pub struct Y4mPipeline {
    writer: Y4mWriter,
    starting: Option<StartingHandler>,
    sample_requested: Option<SampleRequestedHandler>,
}

struct Y4mWriter {
    sink: OutputSink,
    scaler: FrameScaler,
    frame_rate: u32,
    planes: Vec<u8>,
    /// Index of the next frame slot in the output
    next_index: u64,
    frames_written: u64,
    frames_skipped: u64,
}

impl Y4mPipeline {
    /// Validate the stream, pick the output size and write the stream header
    pub fn prepare(
        stream: &VideoStreamDescriptor,
        mut sink: OutputSink,
        profile: &EncodingProfile,
        frame_rate: u32,
    ) -> Result<Self> {
        if stream.size.is_empty() {
            return Err(RecorderError::prepare(format!(
                "Unsupported stream size {}",
                stream.size
            )));
        }
        if frame_rate == 0 {
            return Err(RecorderError::prepare("Frame rate must be at least 1"));
        }
        if profile.hardware_acceleration {
            debug!("Hardware acceleration requested, YUV4MPEG2 output is software only");
        }

        let output = match profile.quality.resolution() {
            Some(max) => calculate_scaled_size(stream.size, max),
            None => calculate_scaled_size(stream.size, stream.size),
        };
        let scaler = FrameScaler::new(stream.size, output)?;

        writeln!(
            sink,
            "YUV4MPEG2 W{} H{} F{}:1 Ip A1:1 C444",
            output.width, output.height, frame_rate
        )
        .map_err(|e| RecorderError::prepare(format!("Failed to write stream header: {}", e)))?;

        info!(
            "YUV4MPEG2 pipeline prepared: {} -> {} @ {}fps ({})",
            stream.size, output, frame_rate, profile.quality
        );

        Ok(Self {
            writer: Y4mWriter {
                sink,
                scaler,
                frame_rate,
                planes: Vec::with_capacity(output.width as usize * output.height as usize * 3),
                next_index: 0,
                frames_written: 0,
                frames_skipped: 0,
            },
            starting: None,
            sample_requested: None,
        })
    }

    /// Size frames are written at
    pub fn output_size(&self) -> Size {
        self.writer.scaler.output_size()
    }
}

impl PreparedPipeline for Y4mPipeline {
    fn on_starting(&mut self, handler: StartingHandler) {
        self.starting = Some(handler);
    }

    fn on_sample_requested(&mut self, handler: SampleRequestedHandler) {
        self.sample_requested = Some(handler);
    }

    fn transcode(self: Box<Self>, on_complete: CompletionHandler) {
        let completion = Arc::new(Mutex::new(Some(on_complete)));
        let Y4mPipeline {
            mut writer,
            starting,
            sample_requested,
        } = *self;

        let thread_completion = completion.clone();
        let spawned = thread::Builder::new()
            .name("y4m-transcode".into())
            .spawn(move || {
                let result = writer.run(starting.as_ref(), sample_requested.as_ref());
                if let Some(on_complete) = thread_completion.lock().take() {
                    on_complete(result);
                }
            });

        if let Err(e) = spawned {
            if let Some(on_complete) = completion.lock().take() {
                on_complete(Err(RecorderError::runtime(format!(
                    "Failed to spawn transcode thread: {}",
                    e
                ))));
            }
        }
    }
}

impl Y4mWriter {
    fn run(
        &mut self,
        starting: Option<&StartingHandler>,
        sample_requested: Option<&SampleRequestedHandler>,
    ) -> Result<()> {
        let origin = match starting {
            Some(starting) => {
                let (request, response) = StartRequest::new();
                starting(request);
                response.blocking_wait()
            }
            None => Duration::ZERO,
        };
        debug!("Transcode started, stream origin {:?}", origin);

        let Some(sample_requested) = sample_requested else {
            warn!("No sample hook registered, finishing empty stream");
            return self.finish();
        };

        loop {
            let (request, response) = SampleRequest::new();
            sample_requested(request);
            let Some(frame) = response.blocking_wait() else {
                break;
            };
            self.write_frame(&frame, origin)?;
        }

        self.finish()
    }

    fn write_frame(&mut self, frame: &Frame, origin: Duration) -> Result<()> {
        let Some(pixels) = frame.surface().pixels() else {
            self.frames_skipped += 1;
            warn!("Skipping frame at {:?}: surface is not CPU-mappable", frame.timestamp());
            return Ok(());
        };

        let elapsed = frame.timestamp().saturating_sub(origin);
        let slot = (elapsed.as_secs_f64() * self.frame_rate as f64).round() as u64;
        let max_repeats = self.frame_rate as u64 * MAX_REPEAT_SECONDS;
        let repeats = (slot + 1)
            .saturating_sub(self.next_index)
            .clamp(1, max_repeats.max(1));

        let scaled = self.scaler.scale(pixels)?;
        bgra_to_yuv444(scaled, &mut self.planes);

        for _ in 0..repeats {
            self.sink
                .write_all(b"FRAME\n")
                .and_then(|_| self.sink.write_all(&self.planes))
                .map_err(|e| RecorderError::runtime(format!("Failed to write frame: {}", e)))?;
        }

        self.next_index += repeats;
        self.frames_written += 1;
        trace!(
            "Wrote frame at {:?} into {} slot(s), next slot {}",
            elapsed,
            repeats,
            self.next_index
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.sink
            .flush()
            .map_err(|e| RecorderError::runtime(format!("Failed to flush output: {}", e)))?;
        info!(
            "Transcode finished - {} frames written ({} slots), {} skipped",
            self.frames_written, self.next_index, self.frames_skipped
        );
        Ok(())
    }
}

/// Convert packed BGRA into three planes (Y, Cb, Cr), BT.601 studio range
fn bgra_to_yuv444(bgra: &[u8], planes: &mut Vec<u8>) {
    let pixels = bgra.len() / 4;
    planes.clear();
    planes.resize(pixels * 3, 0);
    let (y_plane, chroma) = planes.split_at_mut(pixels);
    let (u_plane, v_plane) = chroma.split_at_mut(pixels);

    for (i, px) in bgra.chunks_exact(4).enumerate() {
        let (b, g, r) = (px[0] as i32, px[1] as i32, px[2] as i32);
        y_plane[i] = (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16) as u8;
        u_plane[i] = (((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128) as u8;
        v_plane[i] = (((112 * r - 94 * g - 18 * b + 128) >> 8) + 128) as u8;
    }
}
