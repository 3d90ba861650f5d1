//! Snapshot retention engine
//!
//! Decides, for one backup unit, whether a new dated snapshot is due and
//! performs the cheapest action that brings the destination up to date:
//!
//! 1. no destination or no snapshot yet: full copy into a new snapshot
//! 2. newest snapshot younger than the policy threshold: nothing to do
//! 3. newest snapshot is stale but the source did not change: rename the
//!    snapshot to the current timestamp instead of copying anything
//! 4. otherwise: new snapshot, hard-linking unchanged files against the
//!    newest one
//!
//! The engine keeps no state between calls.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use log::{debug, info, warn};

use super::name::{list_snapshots, snapshot_name, Snapshot};
use super::rsync::{Excludes, SyncTool, TransferStats};
use crate::error::{BackupError, BackupResult};
use crate::plan::BackupUnit;
use crate::process::{spawn_error, CommandLine, CommandRunner};

/// Why a unit did not get a new snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The newest snapshot is younger than the policy threshold
    Current { newest: String },
    /// The source was unchanged; the stale snapshot was renamed
    FastForwarded { from: PathBuf, to: PathBuf },
}

/// Result of evaluating one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    Synced {
        snapshot: PathBuf,
        link_dest: Option<PathBuf>,
    },
}

impl Outcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}

/// Evaluates units and drives the sync tool
pub struct SnapshotEngine<R: CommandRunner> {
    runner: R,
    tool: SyncTool,
}

impl<R: CommandRunner> SnapshotEngine<R> {
    pub fn new(runner: R, tool: SyncTool) -> Self {
        Self { runner, tool }
    }

    pub fn tool(&self) -> &SyncTool {
        &self.tool
    }

    /// Evaluate `unit` at the current local time
    pub fn evaluate_and_sync(
        &self,
        unit: &BackupUnit,
        excludes: Excludes<'_>,
    ) -> BackupResult<Outcome> {
        self.evaluate_and_sync_at(unit, excludes, Local::now())
    }

    /// Evaluate `unit` as if it were `now`
    ///
    /// Existing snapshot names are read in `now`'s time zone, the same zone
    /// new names are written in.
    pub fn evaluate_and_sync_at<Tz>(
        &self,
        unit: &BackupUnit,
        excludes: Excludes<'_>,
        now: DateTime<Tz>,
    ) -> BackupResult<Outcome>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let target = unit.destination.join(snapshot_name(&now));
        let deadline = now.clone() - unit.policy.threshold();

        debug!(
            "{}: src={} dst={} policy={} deadline={}",
            unit.label.display(),
            unit.source.display(),
            unit.destination.display(),
            unit.policy,
            snapshot_name(&deadline)
        );

        if !unit.destination.is_dir() {
            fs::create_dir_all(&unit.destination).map_err(|e| {
                BackupError::Io(format!(
                    "Failed to create {}: {}",
                    unit.destination.display(),
                    e
                ))
            })?;
            info!("{}: first snapshot", unit.label.display());
            return self.sync(unit, &target, None, excludes);
        }

        let snapshots = list_snapshots(&unit.destination, &now.timezone())?;
        let Some(newest) = snapshots.last() else {
            info!("{}: no snapshot yet", unit.label.display());
            return self.sync(unit, &target, None, excludes);
        };
        debug!("{}: newest snapshot {}", unit.label.display(), newest.name);

        if newest.taken_at >= deadline {
            debug!("{}: {} is current", unit.label.display(), newest.name);
            return Ok(Outcome::Skipped(SkipReason::Current {
                newest: newest.name.clone(),
            }));
        }

        if self.unchanged_since(unit, newest, excludes)? {
            info!(
                "{}: unchanged since {}, renaming it to {}",
                unit.label.display(),
                newest.name,
                target.display()
            );
            fs::rename(&newest.path, &target).map_err(|e| {
                BackupError::Io(format!(
                    "Failed to rename {} to {}: {}",
                    newest.path.display(),
                    target.display(),
                    e
                ))
            })?;
            return Ok(Outcome::Skipped(SkipReason::FastForwarded {
                from: newest.path.clone(),
                to: target,
            }));
        }

        self.sync(unit, &target, Some(&newest.path), excludes)
    }

    /// Dry-run the sync against `snapshot` and report whether nothing would move
    fn unchanged_since<Tz: TimeZone>(
        &self,
        unit: &BackupUnit,
        snapshot: &Snapshot<Tz>,
        excludes: Excludes<'_>,
    ) -> BackupResult<bool> {
        let cmd = self
            .tool
            .dry_run_command(&unit.source, &snapshot.path, excludes);
        let stats = self.run_tool(&cmd)?;
        match TransferStats::parse(&stats) {
            Some(stats) => {
                debug!(
                    "{}: {} file(s) would be transferred, {} created, {} deleted",
                    unit.label.display(),
                    stats.transferred,
                    stats.created,
                    stats.deleted
                );
                Ok(stats.is_unchanged())
            }
            None => {
                warn!(
                    "{}: could not read the transfer count from `{}`, assuming changes",
                    unit.label.display(),
                    cmd.render()
                );
                Ok(false)
            }
        }
    }

    fn sync(
        &self,
        unit: &BackupUnit,
        target: &Path,
        link_dest: Option<&Path>,
        excludes: Excludes<'_>,
    ) -> BackupResult<Outcome> {
        let cmd = self
            .tool
            .sync_command(&unit.source, target, link_dest, excludes);
        self.run_tool(&cmd)?;
        info!("{}: synced into {}", unit.label.display(), target.display());
        Ok(Outcome::Synced {
            snapshot: target.to_path_buf(),
            link_dest: link_dest.map(Path::to_path_buf),
        })
    }

    fn run_tool(&self, cmd: &CommandLine) -> BackupResult<String> {
        let output = self.runner.run(cmd).map_err(|e| spawn_error(cmd, e))?;
        if !output.success() {
            return Err(BackupError::SyncTool {
                command: cmd.render(),
                status: output.status,
                output: output.combined().trim().to_string(),
            });
        }
        Ok(output.stdout_text())
    }
}
