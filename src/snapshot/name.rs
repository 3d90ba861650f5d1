//! Snapshot directory naming
//!
//! A snapshot is a directory named after the local time it was taken,
//! `YYYY-MM-DD-HHMM`. The format is fixed width, so sorting names sorts
//! snapshots chronologically.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone};

use crate::error::{BackupError, BackupResult};

/// strftime format of snapshot directory names
pub const SNAPSHOT_FORMAT: &str = "%Y-%m-%d-%H%M";

const SNAPSHOT_NAME_LEN: usize = 15;

/// A dated snapshot directory below a unit's destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<Tz: TimeZone> {
    pub name: String,
    pub path: PathBuf,
    pub taken_at: DateTime<Tz>,
}

/// Directory name for a snapshot taken at `at`
pub fn snapshot_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(SNAPSHOT_FORMAT).to_string()
}

/// Parse a snapshot directory name in the zone `tz`
///
/// Returns `None` for anything that is not exactly a snapshot name. A name
/// that falls in a DST gap is not a valid local time and is ignored; one
/// that falls in a DST fold resolves to the earlier instant.
pub fn parse_snapshot_name<Tz: TimeZone>(name: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    if name.len() != SNAPSHOT_NAME_LEN || !name.starts_with('2') {
        return None;
    }
    let well_formed = name.bytes().enumerate().all(|(i, b)| {
        if matches!(i, 4 | 7 | 10) {
            b == b'-'
        } else {
            b.is_ascii_digit()
        }
    });
    if !well_formed {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(name, SNAPSHOT_FORMAT).ok()?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => Some(at),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => None,
    }
}

/// List the snapshots in `dst`, oldest first
///
/// Files and directories whose name is not a snapshot name are ignored.
pub fn list_snapshots<Tz: TimeZone>(dst: &Path, tz: &Tz) -> BackupResult<Vec<Snapshot<Tz>>> {
    let entries = fs::read_dir(dst).map_err(|e| {
        BackupError::Io(format!("Failed to read {}: {}", dst.display(), e))
    })?;

    let mut snapshots = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            BackupError::Io(format!("Failed to read directory entry: {}", e))
        })?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(taken_at) = parse_snapshot_name(&name, tz) {
            snapshots.push(Snapshot {
                name,
                path: entry.path(),
                taken_at,
            });
        }
    }

    snapshots.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(snapshots)
}
