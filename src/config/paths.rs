//! Configuration file discovery
//!
//! ## Search Order
//!
//! A configuration name that points at an existing file is used as is.
//! Otherwise the name is looked up, first match wins, in:
//!
//! 1. the current directory
//! 2. `<executable dir>/config`, then `<executable dir>`
//! 3. `~/.rsync_backup`, then `~`
//! 4. `/etc/rsync_backup`, then `/etc`
//!
//! The name defaults to `rsync_backup.yml`; `--config` or the
//! `RSYNC_BACKUP_CONFIG` environment variable replace it.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use log::debug;

use crate::error::{BackupError, BackupResult};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "rsync_backup.yml";

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "RSYNC_BACKUP_CONFIG";

/// Finds the configuration file
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    search_dirs: Vec<PathBuf>,
}

impl ConfigLocator {
    /// Locator over the standard search directories
    pub fn new() -> Self {
        let mut dirs = vec![PathBuf::from(".")];

        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            dirs.push(exe_dir.join("config"));
            dirs.push(exe_dir);
        }

        if let Some(base) = BaseDirs::new() {
            let home = base.home_dir();
            dirs.push(home.join(".rsync_backup"));
            dirs.push(home.to_path_buf());
        }

        dirs.push(PathBuf::from("/etc/rsync_backup"));
        dirs.push(PathBuf::from("/etc"));

        Self { search_dirs: dirs }
    }

    /// Locator over custom directories (useful for testing)
    pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Resolve `requested` (or the default name) to an existing file
    pub fn locate(&self, requested: Option<&Path>) -> BackupResult<PathBuf> {
        let name = requested.unwrap_or_else(|| Path::new(CONFIG_FILE_NAME));
        if name.is_file() {
            return Ok(name.to_path_buf());
        }

        for dir in &self.search_dirs {
            let candidate = dir.join(name);
            if candidate.is_file() {
                debug!("Using configuration file {}", candidate.display());
                return Ok(candidate);
            }
        }

        Err(BackupError::config(format!(
            "Cannot find configuration file {}",
            name.display()
        )))
    }
}

impl Default for ConfigLocator {
    fn default() -> Self {
        Self::new()
    }
}
