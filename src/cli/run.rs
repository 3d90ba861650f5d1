//! Backup run command

use crate::config::BackupConfig;
use crate::error::BackupResult;
use crate::notify::Notifier;
use crate::orchestrator::Orchestrator;
use crate::plan::RunSummary;
use crate::process::CommandRunner;

/// Handle the run command
///
/// Prints the summary line. With `notify` set, the summary or the error is
/// also posted as a desktop notification.
pub fn handle_run_command<R: CommandRunner + Clone>(
    runner: R,
    config: &BackupConfig,
    ask_pass: bool,
) -> BackupResult<RunSummary> {
    let notifier = Notifier::new(runner.clone(), config.notify);

    match Orchestrator::new(runner).ask_pass(ask_pass).run(config) {
        Ok(summary) => {
            let line = summary.line(config.summary_title());
            println!("{}", line);
            notifier.notify(&line);
            Ok(summary)
        }
        Err(e) => {
            notifier.notify(&e.to_string());
            Err(e)
        }
    }
}
