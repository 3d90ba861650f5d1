//! External command execution
//!
//! Commands are built as a program plus a structured argument list and
//! handed straight to the OS, never through a shell. A non-zero exit is a
//! normal result for the caller to inspect; only failing to start the
//! program at all is an error.

use std::ffi::{OsStr, OsString};
use std::io::{self, Write};
use std::process::{Command, Stdio};

use log::{debug, trace};
use zeroize::Zeroizing;

use crate::crypto::Passphrase;
use crate::error::{BackupError, BackupResult};

/// A command to run: program, arguments and optional secret stdin
#[derive(Clone)]
pub struct CommandLine {
    program: String,
    args: Vec<OsString>,
    stdin: Option<Zeroizing<Vec<u8>>>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Stream a passphrase through the child's stdin
    pub fn stdin_secret(mut self, passphrase: &Passphrase) -> Self {
        self.stdin = Some(passphrase.to_stdin());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Arguments as lossy strings, handy for matching
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    pub fn stdin(&self) -> Option<&[u8]> {
        self.stdin.as_ref().map(|s| s.as_slice())
    }

    /// Printable form for logs and errors; never includes stdin
    pub fn render(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                out.push('\'');
                out.push_str(&arg.replace('\'', "'\\''"));
                out.push('\'');
            } else {
                out.push_str(&arg);
            }
        }
        out
    }
}

impl std::fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandLine")
            .field("command", &self.render())
            .field("stdin", &self.stdin.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Exit status and captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into().into_bytes(),
            stderr: Vec::new(),
        }
    }

    /// Failed output with the given status and stderr
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: Vec::new(),
            stderr: stderr.into().into_bytes(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stdout followed by stderr
    pub fn combined(&self) -> String {
        let mut text = self.stdout_text();
        let stderr = String::from_utf8_lossy(&self.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }
        text
    }
}

/// Executes external commands
pub trait CommandRunner {
    /// Run `cmd` to completion; `Err` only if it could not be started
    fn run(&self, cmd: &CommandLine) -> io::Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, cmd: &CommandLine) -> io::Result<CommandOutput> {
        (**self).run(cmd)
    }
}

/// Runs commands on the host with `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &CommandLine) -> io::Result<CommandOutput> {
        debug!("$ {}", cmd.render());
        let mut command = Command::new(cmd.program());
        command
            .args(cmd.get_args())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if cmd.stdin().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = command.spawn()?;
        let mut stdin_error = None;
        if let (Some(data), Some(mut pipe)) = (cmd.stdin(), child.stdin.take()) {
            // the child may exit without reading everything; still reap it
            stdin_error = pipe.write_all(data).err();
            // dropping the pipe closes it so the child sees EOF
        }
        let output = child.wait_with_output()?;
        if let Some(err) = stdin_error {
            if output.status.success() {
                return Err(err);
            }
            debug!("`{}` did not read its input: {}", cmd.program(), err);
        }
        let status = output
            .status
            .code()
            .unwrap_or(if output.status.success() { 0 } else { 1 });

        let result = CommandOutput {
            status,
            stdout: output.stdout,
            stderr: output.stderr,
        };
        trace!("exit {}:\n{}", result.status, result.combined());
        Ok(result)
    }
}

/// Map a spawn failure to a readable error
pub fn spawn_error(cmd: &CommandLine, err: io::Error) -> BackupError {
    if err.kind() == io::ErrorKind::NotFound {
        BackupError::Process(format!("`{}` not found on PATH", cmd.program()))
    } else {
        BackupError::Process(format!("failed to run `{}`: {}", cmd.render(), err))
    }
}

/// Run a command that may fail as a normal answer
///
/// A non-zero exit is logged at debug level and returned to the caller.
pub fn run_probe<R: CommandRunner + ?Sized>(
    runner: &R,
    cmd: &CommandLine,
) -> BackupResult<CommandOutput> {
    let output = runner.run(cmd).map_err(|e| spawn_error(cmd, e))?;
    if !output.success() {
        debug!(
            "`{}` exited with {}: {}",
            cmd.render(),
            output.status,
            output.combined().trim()
        );
    }
    Ok(output)
}

/// Run a command that must succeed
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    cmd: &CommandLine,
) -> BackupResult<CommandOutput> {
    let output = runner.run(cmd).map_err(|e| spawn_error(cmd, e))?;
    if !output.success() {
        return Err(BackupError::DeviceCommand {
            command: cmd.render(),
            status: output.status,
            output: output.combined().trim().to_string(),
        });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_quotes_whitespace() {
        let cmd = CommandLine::new("rsync")
            .arg("-am")
            .arg("/Users/me/My Documents/");
        assert_eq!(cmd.render(), "rsync -am '/Users/me/My Documents/'");
    }

    #[test]
    fn test_render_hides_stdin() {
        let cmd = CommandLine::new("diskutil")
            .args(["cs", "unlockVolume", "UUID", "-stdinpassphrase"])
            .stdin_secret(&Passphrase::new("hunter2"));
        assert!(!cmd.render().contains("hunter2"));
        assert!(!format!("{:?}", cmd).contains("hunter2"));
        assert_eq!(cmd.stdin(), Some(&b"hunter2"[..]));
    }

    #[test]
    fn test_combined_output() {
        let output = CommandOutput {
            status: 1,
            stdout: b"out".to_vec(),
            stderr: b"err".to_vec(),
        };
        assert_eq!(output.combined(), "out\nerr");
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_non_zero_is_not_error() {
        let output = SystemRunner
            .run(&CommandLine::new("sh").args(["-c", "echo hi; exit 3"]))
            .unwrap();
        assert_eq!(output.status, 3);
        assert_eq!(output.stdout_text().trim(), "hi");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_streams_stdin() {
        let output = SystemRunner
            .run(&CommandLine::new("cat").stdin_secret(&Passphrase::new("piped")))
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_text(), "piped");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_reports_exit_when_stdin_is_ignored() {
        // larger than a pipe buffer, so the write fails once the child is gone
        let input = Passphrase::new("x".repeat(1 << 20));
        let output = SystemRunner
            .run(
                &CommandLine::new("sh")
                    .args(["-c", "echo wrong passphrase >&2; exit 5"])
                    .stdin_secret(&input),
            )
            .unwrap();
        assert_eq!(output.status, 5);
        assert_eq!(output.combined().trim(), "wrong passphrase");
    }

    #[test]
    fn test_missing_program_is_process_error() {
        let cmd = CommandLine::new("definitely-not-a-real-program-7f3a");
        let err = run_checked(&SystemRunner, &cmd).unwrap_err();
        assert!(matches!(err, BackupError::Process(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_checked_maps_failure() {
        let cmd = CommandLine::new("sh").args(["-c", "echo boom >&2; exit 2"]);
        match run_checked(&SystemRunner, &cmd).unwrap_err() {
            BackupError::DeviceCommand { status, output, .. } => {
                assert_eq!(status, 2);
                assert_eq!(output, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(run_probe(&SystemRunner, &cmd).is_ok());
    }
}
