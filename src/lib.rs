//! rsync-backup - dated, hard-linked snapshots on an external volume
//!
//! This library mounts a backup volume (a plain partition, an encrypted
//! CoreStorage volume or a disk image), decides for every configured
//! directory whether its newest snapshot has expired, and drives `rsync`
//! to take a new snapshot that hard-links unchanged files to the previous
//! one.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration discovery and the YAML document
//! - `error`: Custom error types
//! - `process`: External command execution
//! - `crypto`: Passphrase resolution for locked volumes
//! - `volume`: Backup volume lifecycle
//! - `snapshot`: Retention decisions and the sync tool contract
//! - `plan`: Backup units and the per-run plan
//! - `orchestrator`: One complete backup run
//! - `notify`: Desktop notifications
//! - `cli`, `display`: Command handlers and terminal output
//!
//! # Example
//!
//! ```rust,ignore
//! use rsync_backup::config::{BackupConfig, ConfigLocator};
//! use rsync_backup::orchestrator::Orchestrator;
//! use rsync_backup::process::SystemRunner;
//!
//! let path = ConfigLocator::new().locate(None)?;
//! let config = BackupConfig::load(&path)?;
//! let summary = Orchestrator::new(SystemRunner).run(&config)?;
//! println!("{}", summary.line(config.summary_title()));
//! ```

pub mod cli;
pub mod config;
pub mod crypto;
pub mod display;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod plan;
pub mod process;
pub mod snapshot;
pub mod volume;

pub use error::{BackupError, BackupResult};
