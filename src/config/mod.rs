//! Configuration module for rsync-backup
//!
//! This module provides:
//! - Configuration file discovery
//! - The YAML configuration document and its validation

pub mod paths;
pub mod settings;

pub use paths::{ConfigLocator, CONFIG_ENV, CONFIG_FILE_NAME};
pub use settings::{
    BackupConfig, BackupEntry, DeviceConfig, EntryKind, UnitOverride, UnitSettings,
};
