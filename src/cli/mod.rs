//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup library.

pub mod run;
pub mod validate;
pub mod volume;

pub use run::handle_run_command;
pub use validate::handle_validate_command;
pub use volume::{handle_volume_command, VolumeCommands};
