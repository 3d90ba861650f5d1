//! Configuration check command
//!
//! Loads the configuration and expands the backup plan without touching
//! the volume, so mistakes show up before a real run.

use std::path::Path;

use crate::config::BackupConfig;
use crate::display::format_plan;
use crate::error::{BackupError, BackupResult};
use crate::plan::resolve_units;

/// Handle the validate command
pub fn handle_validate_command(config_path: &Path, config: &BackupConfig) -> BackupResult<()> {
    let device = config.device_config()?;
    if !config.src.is_dir() {
        return Err(BackupError::config("Base source directory not mounted"));
    }
    // destinations are shown relative to the volume
    let units = resolve_units(config, &config.src, &config.dst)?;

    println!("Configuration: {}", config_path.display());
    println!("Title:         {}", config.summary_title());
    println!("Source:        {}", config.src.display());
    println!(
        "Destination:   {}",
        config.mount_root.join(&device.name).join(&config.dst).display()
    );
    match &device.image {
        Some(image) => println!("Device:        {} (image {})", device.name, image.display()),
        None => println!("Device:        {}", device.name),
    }
    if !config.exclude.is_empty() {
        println!("Excludes:      {}", config.exclude.join(", "));
    }
    println!();
    print!("{}", format_plan(&units));
    if units.is_empty() {
        println!();
    }
    Ok(())
}
