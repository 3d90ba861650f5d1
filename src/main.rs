use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use rsync_backup::cli::{
    handle_run_command, handle_validate_command, handle_volume_command, VolumeCommands,
};
use rsync_backup::config::{BackupConfig, ConfigLocator, CONFIG_ENV};
use rsync_backup::process::SystemRunner;

#[derive(Parser)]
#[command(
    name = "rsync-backup",
    version,
    about = "Dated, hard-linked rsync snapshots on an external volume",
    long_about = "rsync-backup mounts a (possibly encrypted) backup volume, takes a \
                  dated snapshot of every configured directory whose retention \
                  period has expired, hard-linking unchanged files to the previous \
                  snapshot, and unmounts the volume again."
)]
struct Cli {
    /// Configuration file, either a path or a name looked up in the
    /// standard configuration directories
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the backup (default)
    Run {
        /// Prompt for the volume passphrase if none is configured
        #[arg(long)]
        ask_pass: bool,
    },

    /// Check the configuration and show the backup plan
    Validate,

    /// Backup volume commands
    #[command(subcommand)]
    Volume(VolumeCommands),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = ConfigLocator::new().locate(cli.config.as_deref())?;
    let config = BackupConfig::load(&config_path)?;

    match cli.command.unwrap_or(Commands::Run { ask_pass: false }) {
        Commands::Run { ask_pass } => {
            handle_run_command(SystemRunner, &config, ask_pass)?;
        }
        Commands::Validate => {
            handle_validate_command(&config_path, &config)?;
        }
        Commands::Volume(cmd) => {
            handle_volume_command(SystemRunner, &config, cmd)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
