//! Volume CLI commands
//!
//! Drive the backup volume by hand, outside of a backup run.

use clap::Subcommand;

use crate::config::BackupConfig;
use crate::display::format_volume_status;
use crate::error::BackupResult;
use crate::orchestrator::passphrase_resolver;
use crate::process::CommandRunner;
use crate::volume::{mount_volume, Volume};

/// Volume subcommands
#[derive(Subcommand)]
pub enum VolumeCommands {
    /// Show whether the backup volume is attached, locked or mounted
    Status,

    /// Unlock and mount the backup volume, leaving it mounted
    Mount {
        /// Prompt for the passphrase if none is configured
        #[arg(long)]
        ask_pass: bool,
    },

    /// Unmount the backup volume
    Unmount,
}

/// Handle a volume command
pub fn handle_volume_command<R: CommandRunner>(
    runner: R,
    config: &BackupConfig,
    cmd: VolumeCommands,
) -> BackupResult<()> {
    let device = config.device_config()?;
    let mut volume = Volume::open(runner, &device, &config.mount_root)?;

    match cmd {
        VolumeCommands::Status => {
            let state = volume.state()?;
            print!(
                "{}",
                format_volume_status(volume.name(), volume.kind(), state, volume.mount_point())
            );
        }

        VolumeCommands::Mount { ask_pass } => {
            let mounted = mount_volume(volume, passphrase_resolver(&device, ask_pass))?;
            println!(
                "Mounted {} at {}",
                mounted.volume().name(),
                mounted.mount_point().display()
            );
            mounted.keep_mounted();
        }

        VolumeCommands::Unmount => {
            volume.unmount()?;
            println!("{} is not mounted", volume.name());
        }
    }

    Ok(())
}
