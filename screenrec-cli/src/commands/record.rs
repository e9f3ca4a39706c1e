//! Record command - capture a display into a file

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use screenrec_core::{ConfigFile, Quality, ScreenRecorder, SyntheticPlatform};
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Arguments for the record command
#[derive(Args)]
pub struct RecordArgs {
    /// Output file (defaults to the config's output, usually recording.y4m)
    output: Option<PathBuf>,

    /// Device name (or prefix) of the display to record.
    /// If not specified, the primary display is recorded
    #[arg(short, long)]
    monitor: Option<String>,

    /// Output quality (auto, 1080p, 720p, wvga, ntsc, pal, vga, qvga, 4k, 8k)
    #[arg(short, long)]
    quality: Option<Quality>,

    /// Disable hardware encoders
    #[arg(long)]
    no_hardware_acceleration: bool,

    /// Capture frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Stop after this many seconds
    #[arg(short, long, value_name = "SECS")]
    duration: Option<u64>,

    /// Give up waiting for the encoder after this many seconds on shutdown
    #[arg(long, value_name = "SECS")]
    shutdown_timeout: Option<u64>,
}

/// Record until interrupted
pub async fn record(args: RecordArgs, config: &ConfigFile) -> Result<()> {
    let mut options = config.recorder_options();
    if let Some(quality) = args.quality {
        options = options.with_quality(quality);
    }
    if args.no_hardware_acceleration {
        options = options.with_hardware_acceleration(false);
    }
    if let Some(monitor) = args.monitor {
        options = options.with_monitor(monitor);
    }
    if let Some(secs) = args.shutdown_timeout {
        options = options.with_shutdown_timeout(Duration::from_secs(secs));
    }

    let mut synthetic = config.synthetic.clone();
    if let Some(fps) = args.fps {
        synthetic.frame_rate = fps;
    }
    let platform = SyntheticPlatform::from_settings(&synthetic);

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.recorder.output));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;

    let mut recorder =
        match ScreenRecorder::create(&platform, Box::new(BufWriter::new(file)), &options) {
            Ok(recorder) => recorder,
            Err(e) => {
                if let Some(hint) = e.user_hint() {
                    eprintln!("Hint: {}", hint);
                }
                return Err(e).context("Failed to start recording");
            }
        };

    println!("Recording in {}.", path.display());
    println!("Press Enter or Ctrl+C to stop...\n");

    let limit = args.duration;
    let duration = async move {
        match limit {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    let mut finished = recorder.finished();

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received interrupt signal");
        }
        Ok(()) = enter_pressed() => {
            info!("Stop requested");
        }
        _ = duration => {
            info!("Recording duration elapsed");
        }
        _ = finished.wait_for(|done| *done) => {
            warn!("Recording ended before it was stopped");
        }
    }

    recorder.dispose().await.context("Recording failed")?;
    info!("{}", recorder.stats());

    println!("Recording finished.");

    Ok(())
}

/// Resolves when a line is read from stdin. Closed stdin never resolves.
fn enter_pressed() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    // A plain thread, so a pending read never holds up runtime shutdown
    std::thread::spawn(move || {
        let mut line = String::new();
        if matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            let _ = tx.send(());
        }
    });
    rx
}
