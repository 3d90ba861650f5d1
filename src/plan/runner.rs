//! Runs the retention engine over every unit of a plan

use log::{error, info};

use super::exclude::ExcludeSet;
use super::unit::BackupUnit;
use crate::error::BackupResult;
use crate::process::CommandRunner;
use crate::snapshot::{Outcome, SnapshotEngine};

/// Counts of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Units evaluated
    pub total: usize,
    /// Units that got a new snapshot
    pub changed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &Outcome) {
        self.total += 1;
        if outcome.is_synced() {
            self.changed += 1;
        }
    }

    /// `"<title>: <changed> / <total> changed."`
    pub fn line(&self, title: &str) -> String {
        format!("{}: {} / {} changed.", title, self.changed, self.total)
    }
}

/// Evaluates units one after another
///
/// The first failing unit aborts the run; later units are not attempted.
pub struct PlanRunner<'a, R: CommandRunner> {
    engine: &'a SnapshotEngine<R>,
    excludes: &'a ExcludeSet,
}

impl<'a, R: CommandRunner> PlanRunner<'a, R> {
    pub fn new(engine: &'a SnapshotEngine<R>, excludes: &'a ExcludeSet) -> Self {
        Self { engine, excludes }
    }

    pub fn run(&self, units: &[BackupUnit]) -> BackupResult<RunSummary> {
        let mut summary = RunSummary::default();
        for unit in units {
            info!("backup {}", unit.label.display());
            let outcome = self
                .engine
                .evaluate_and_sync(unit, self.excludes.for_unit(unit))
                .map_err(|e| {
                    error!("{}: {}", unit.label.display(), e);
                    e
                })?;
            summary.record(&outcome);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::ScriptedRunner;
    use crate::process::CommandOutput;
    use crate::snapshot::{RetentionPolicy, SyncTool};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn units(temp: &TempDir, names: &[&str]) -> Vec<BackupUnit> {
        names
            .iter()
            .map(|name| BackupUnit {
                label: PathBuf::from(name),
                source: PathBuf::from("/src").join(name),
                destination: temp.path().join(name),
                policy: RetentionPolicy::Daily,
                excludes: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_counts_synced_units() {
        let temp = TempDir::new().unwrap();
        let units = units(&temp, &["a", "b", "c"]);
        // "b" already has a current snapshot
        std::fs::create_dir_all(
            temp.path()
                .join("b")
                .join(crate::snapshot::snapshot_name(&chrono::Local::now())),
        )
        .unwrap();

        let runner = ScriptedRunner::new().on("rsync", &[], [CommandOutput::ok("")]);
        let engine = SnapshotEngine::new(&runner, SyncTool::default());
        let excludes = ExcludeSet::create(&["*.tmp".into()]).unwrap();

        let summary = PlanRunner::new(&engine, &excludes).run(&units).unwrap();
        assert_eq!(summary, RunSummary { total: 3, changed: 2 });
        assert_eq!(summary.line("Done"), "Done: 2 / 3 changed.");

        let exclude_arg = format!("--exclude-from={}", excludes.path().display());
        assert!(runner
            .calls()
            .iter()
            .all(|c| c.args.contains(&exclude_arg)));
    }

    #[test]
    fn test_first_failure_stops_the_run() {
        let temp = TempDir::new().unwrap();
        let units = units(&temp, &["a", "b"]);
        let runner = ScriptedRunner::new().on("rsync", &[], [CommandOutput::failed(1, "boom")]);
        let engine = SnapshotEngine::new(&runner, SyncTool::default());
        let excludes = ExcludeSet::create(&[]).unwrap();

        assert!(PlanRunner::new(&engine, &excludes).run(&units).is_err());
        assert_eq!(runner.calls().len(), 1);
    }
}
