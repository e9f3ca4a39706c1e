//! Screenrec CLI
//!
//! Records a display into a YUV4MPEG2 file.
//!
//! # Usage
//!
//! ```bash
//! # List available displays
//! screenrec list-displays
//!
//! # Record the primary display until Enter is pressed
//! screenrec record
//!
//! # Record ten seconds of the second display at VGA quality
//! screenrec record clip.y4m --monitor VIRTUAL-2 --quality vga --duration 10
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use screenrec_core::ConfigFile;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Screenrec - display recorder
#[derive(Parser)]
#[command(name = "screenrec")]
#[command(version)]
#[command(about = "Record a display to a YUV4MPEG2 file", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use this config file instead of the default one
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a display
    Record(commands::RecordArgs),

    /// List available displays
    #[command(alias = "ls")]
    ListDisplays,

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("screenrec={}", level).parse()?)
                .add_directive(format!("screenrec_core={}", level).parse()?),
        )
        .with_target(false)
        .init();

    let config = match &cli.config_path {
        Some(path) => ConfigFile::load_from(path.clone())
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ConfigFile::load_or_default(),
    };

    match cli.command {
        Commands::Record(args) => commands::record(args, &config).await?,
        Commands::ListDisplays => commands::list_displays(&config)?,
        Commands::Config(args) => commands::config(args, cli.config_path)?,
    }

    Ok(())
}
