//! Desktop notifications
//!
//! Posts the run summary and fatal errors through `osascript` when the
//! configuration asks for it. Notifications are best effort.

use log::{debug, warn};

use crate::process::{CommandLine, CommandRunner};

pub const NOTIFICATION_TITLE: &str = "Rsync Backup";

pub struct Notifier<R: CommandRunner> {
    runner: R,
    enabled: bool,
}

impl<R: CommandRunner> Notifier<R> {
    pub fn new(runner: R, enabled: bool) -> Self {
        Self { runner, enabled }
    }

    /// Post `message`; failures are logged and otherwise ignored
    pub fn notify(&self, message: &str) {
        if !self.enabled {
            return;
        }
        let cmd = notification_command(message);
        debug!("notify: {}", message);
        match self.runner.run(&cmd) {
            Ok(output) if output.success() => {}
            Ok(output) => warn!("Notification failed: {}", output.combined().trim()),
            Err(e) => warn!("Notification failed: {}", e),
        }
    }
}

pub fn notification_command(message: &str) -> CommandLine {
    let script = format!(
        "display notification \"{}\" with title \"{}\"",
        applescript_escape(message),
        NOTIFICATION_TITLE
    );
    CommandLine::new("osascript").arg("-e").arg(script)
}

fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::ScriptedRunner;
    use crate::process::CommandOutput;

    #[test]
    fn test_command_quotes_message() {
        let cmd = notification_command(r#"Disk "Backup" not attached"#);
        assert_eq!(
            cmd.args_lossy(),
            vec![
                "-e",
                r#"display notification "Disk \"Backup\" not attached" with title "Rsync Backup""#
            ]
        );
    }

    #[test]
    fn test_disabled_notifier_runs_nothing() {
        let runner = ScriptedRunner::new();
        Notifier::new(&runner, false).notify("Done: 1 / 1 changed.");
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_failures_are_not_fatal() {
        let runner = ScriptedRunner::new().on("osascript", &[], [CommandOutput::failed(1, "no GUI")]);
        let notifier = Notifier::new(&runner, true);
        notifier.notify("Done: 0 / 2 changed.");
        assert_eq!(runner.calls().len(), 1);

        // no scripted answer at all behaves like a missing osascript
        Notifier::new(ScriptedRunner::new(), true).notify("ignored");
    }
}
