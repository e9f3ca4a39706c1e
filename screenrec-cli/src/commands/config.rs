//! Config command - manage configuration files

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use screenrec_core::config::{sample_config, ConfigFile};
use screenrec_core::SyntheticPlatform;

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Validate the configuration and show the settings a recording would use
    Show,

    /// Write the default configuration to the config file
    Init {
        /// Force overwrite if file exists
        #[arg(short, long)]
        force: bool,
    },

    /// Print a commented sample configuration to stdout
    Sample,
}

/// Run config subcommand
pub fn config(args: ConfigArgs, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(ConfigFile::default_path);

    match args.command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            if path.exists() {
                println!("(file exists)");
            } else {
                println!("(file does not exist)");
            }
        }
        ConfigCommand::Show => {
            if path.exists() {
                println!("Configuration file: {}\n", path.display());
            } else {
                println!("No configuration file at {}, showing defaults\n", path.display());
            }

            let config = ConfigFile::load_from(path.clone())
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;
            print!("{}", describe(&config));
        }
        ConfigCommand::Init { force } => {
            if init(&path, force)? {
                println!("Created configuration file: {}", path.display());
                println!();
                println!("Run 'screenrec config sample' for a commented version of every setting.");
            } else {
                println!("Configuration file already exists: {}", path.display());
                println!();
                println!("Use --force to overwrite, or edit the existing file.");
            }
        }
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
    }

    Ok(())
}

/// Write the default configuration unless a file is already there.
/// Returns whether the file was written.
fn init(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }

    ConfigFile::default()
        .save_to(path.to_path_buf())
        .context("Failed to write config file")?;
    Ok(true)
}

/// Effective recorder options and the displays the synthetic platform offers
fn describe(config: &ConfigFile) -> String {
    let options = config.recorder_options();
    let platform = SyntheticPlatform::from_settings(&config.synthetic);
    let mut out = String::new();

    let _ = writeln!(out, "Recorder");
    let _ = writeln!(out, "  Quality:              {}", options.quality);
    let _ = writeln!(
        out,
        "  Hardware acceleration: {}",
        if options.hardware_acceleration { "on" } else { "off" }
    );
    let _ = writeln!(
        out,
        "  Monitor:              {}",
        options.monitor_device_name.as_deref().unwrap_or("primary")
    );
    let _ = writeln!(
        out,
        "  Shutdown timeout:     {}",
        match options.shutdown_timeout {
            Some(timeout) => format!("{}s", timeout.as_secs()),
            None => "none".to_string(),
        }
    );
    let _ = writeln!(out, "  Output:               {}", config.recorder.output);

    let _ = writeln!(out);
    let _ = writeln!(out, "Displays ({} fps)", platform.frame_rate());
    if platform.list_displays().is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for display in platform.list_displays() {
        let _ = writeln!(
            out,
            "  {} {}{}",
            display.name,
            display.size,
            if display.primary { " (primary)" } else { "" }
        );
    }

    out
}
