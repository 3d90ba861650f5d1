//! Custom error types for rsync-backup
//!
//! Every failure is fatal for the run. The variants are grouped into
//! categories (configuration, device state, sync tool, filesystem) so the
//! caller can report what kind of problem stopped the backup.

use std::fmt;

use thiserror::Error;

/// The main error type for rsync-backup operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// Missing or invalid configuration, unresolved device or secret
    #[error("Configuration error: {0}")]
    Config(String),

    /// The volume could not be attached, unlocked, mounted or released
    #[error("Device error: {0}")]
    DeviceState(String),

    /// A volume-management command that must succeed exited non-zero
    #[error("Command `{command}` failed with status {status}: {output}")]
    DeviceCommand {
        command: String,
        status: i32,
        output: String,
    },

    /// The sync tool exited non-zero
    #[error("Sync tool `{command}` failed with status {status}: {output}")]
    SyncTool {
        command: String,
        status: i32,
        output: String,
    },

    /// An external program could not be started
    #[error("Process error: {0}")]
    Process(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

}

/// Coarse classification of a [`BackupError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    DeviceState,
    SyncTool,
    /// Reading or writing snapshot and source directories
    Filesystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::DeviceState => write!(f, "device"),
            Self::SyncTool => write!(f, "sync"),
            Self::Filesystem => write!(f, "filesystem"),
        }
    }
}

impl BackupError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a device state error
    pub fn device(message: impl Into<String>) -> Self {
        Self::DeviceState(message.into())
    }

    /// Which category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Io(_) => ErrorCategory::Filesystem,
            Self::DeviceState(_) | Self::DeviceCommand { .. } => ErrorCategory::DeviceState,
            Self::SyncTool { .. } | Self::Process(_) => ErrorCategory::SyncTool,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for rsync-backup operations
pub type BackupResult<T> = Result<T, BackupError>;
