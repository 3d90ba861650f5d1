//! Exclude patterns of a run
//!
//! The global patterns are written once to a temporary file that every
//! rsync invocation references with `--exclude-from`. The file lives as
//! long as the `ExcludeSet` and is removed when it is dropped, on success
//! and failure alike.

use std::io::Write;
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

use crate::error::{BackupError, BackupResult};
use crate::snapshot::Excludes;

use super::unit::BackupUnit;

/// Global exclude patterns, backed by a temporary file
#[derive(Debug)]
pub struct ExcludeSet {
    file: NamedTempFile,
}

impl ExcludeSet {
    /// Write `patterns` to a fresh temporary file
    pub fn create(patterns: &[String]) -> BackupResult<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("rsync_backup.exclude")
            .tempfile()
            .map_err(|e| BackupError::Io(format!("Failed to create exclude file: {}", e)))?;

        file.write_all(patterns.join("\n").as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| BackupError::Io(format!("Failed to write exclude file: {}", e)))?;

        debug!(
            "Wrote {} global exclude pattern(s) to {}",
            patterns.len(),
            file.path().display()
        );

        Ok(Self { file })
    }

    /// Path of the temporary file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Global file plus the unit's own patterns
    pub fn for_unit<'a>(&'a self, unit: &'a BackupUnit) -> Excludes<'a> {
        Excludes {
            file: Some(self.path()),
            patterns: &unit.excludes,
        }
    }
}
