//! List displays command

use anyhow::Result;
use screenrec_core::{ConfigFile, SyntheticPlatform};

/// List the displays that can be recorded
pub fn list_displays(config: &ConfigFile) -> Result<()> {
    let platform = SyntheticPlatform::from_settings(&config.synthetic);
    let displays = platform.list_displays();

    if displays.is_empty() {
        println!("No displays found.");
        println!("\nAdd [[synthetic.displays]] entries to the config file.");
        return Ok(());
    }

    println!("{:<24} {:<12} {}", "Device name", "Resolution", "Primary");
    println!("{}", "-".repeat(44));

    for display in displays {
        println!(
            "{:<24} {:<12} {}",
            truncate(&display.name, 22),
            display.size.to_string(),
            if display.primary { "yes" } else { "" }
        );
    }

    println!("\nFrame rate: {} fps", platform.frame_rate());
    println!("Pass a device name (or a prefix of it) to 'screenrec record --monitor'.");

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max - 3).collect();
        format!("{}...", kept)
    }
}
