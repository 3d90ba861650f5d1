//! One complete backup run
//!
//! Mounts the backup volume, evaluates every unit and releases the volume
//! again. The exclude file and the mount are scoped to the run and are
//! cleaned up on every exit path.

use std::fs;
use std::path::Path;

use log::info;

use crate::config::{BackupConfig, DeviceConfig};
use crate::crypto::{prompt_passphrase, resolve_passphrase, Passphrase};
use crate::error::{BackupError, BackupResult};
use crate::plan::{resolve_units, ExcludeSet, PlanRunner, RunSummary};
use crate::process::CommandRunner;
use crate::snapshot::{SnapshotEngine, SyncTool};
use crate::volume::{mount_volume, Volume};

/// Passphrase lookup for `device`: configured secret first, then an
/// interactive prompt when `ask_pass` allows it
pub fn passphrase_resolver(
    device: &DeviceConfig,
    ask_pass: bool,
) -> impl FnOnce() -> BackupResult<Option<Passphrase>> + '_ {
    move || match resolve_passphrase(device)? {
        Some(passphrase) => Ok(Some(passphrase)),
        None if ask_pass => prompt_passphrase(&device.name).map(Some),
        None => Ok(None),
    }
}

pub struct Orchestrator<R: CommandRunner + Clone> {
    runner: R,
    ask_pass: bool,
}

impl<R: CommandRunner + Clone> Orchestrator<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            ask_pass: false,
        }
    }

    /// Prompt for the passphrase when no configured secret resolves
    pub fn ask_pass(mut self, ask_pass: bool) -> Self {
        self.ask_pass = ask_pass;
        self
    }

    pub fn run(&self, config: &BackupConfig) -> BackupResult<RunSummary> {
        if !config.src.is_dir() {
            return Err(BackupError::config("Base source directory not mounted"));
        }
        let device = config.device_config()?;

        let volume = Volume::open(self.runner.clone(), &device, &config.mount_root)?;
        let mounted = mount_volume(volume, passphrase_resolver(&device, self.ask_pass))?;
        let summary = self.run_mounted(config, mounted.mount_point())?;
        mounted.release()?;
        Ok(summary)
    }

    fn run_mounted(&self, config: &BackupConfig, mount_point: &Path) -> BackupResult<RunSummary> {
        let base_dst = mount_point.join(&config.dst);
        if !base_dst.is_dir() {
            fs::create_dir_all(&base_dst).map_err(|e| {
                BackupError::Io(format!("Failed to create {}: {}", base_dst.display(), e))
            })?;
        }
        if !base_dst.is_dir() {
            return Err(BackupError::device("Backup destination is not mounted"));
        }
        info!("Backing up {} to {}", config.src.display(), base_dst.display());

        let excludes = ExcludeSet::create(&config.exclude)?;
        let units = resolve_units(config, &config.src, &base_dst)?;
        let engine = SnapshotEngine::new(self.runner.clone(), SyncTool::new(config.rsync.clone()));
        PlanRunner::new(&engine, &excludes).run(&units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::ScriptedRunner;
    use crate::process::CommandOutput;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        src: PathBuf,
        mount_root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let src = temp.path().join("home");
            let mount_root = temp.path().join("Volumes");
            fs::create_dir_all(src.join("Documents")).unwrap();
            fs::create_dir_all(mount_root.join("Backup")).unwrap();
            Self {
                _temp: temp,
                src,
                mount_root,
            }
        }

        fn config(&self) -> BackupConfig {
            BackupConfig::from_yaml_str(&format!(
                "src: {}\ndst: laptop\nmount_root: {}\ndeviceName: Backup\nexclude: ['.DS_Store']\nbackups:\n  - dir: Documents\n",
                self.src.display(),
                self.mount_root.display()
            ))
            .unwrap()
        }

        fn mounted_line(&self) -> String {
            format!("/dev/disk2s2 on {} (hfs, local)\n", self.mount_root.join("Backup").display())
        }

        fn runner(&self, rsync: CommandOutput) -> ScriptedRunner {
            let mounted = self.mounted_line();
            ScriptedRunner::new()
                .on("diskutil", &["list"], [CommandOutput::ok("   1: Apple_HFS Backup 1.0 TB disk2s2\n")])
                .on("diskutil", &["cs", "info"], [CommandOutput::failed(1, "not CoreStorage")])
                .on("diskutil", &["cs", "list"], [CommandOutput::ok("")])
                .on("diskutil", &["mount"], [CommandOutput::ok("")])
                .on("diskutil", &["unmount"], [CommandOutput::ok("")])
                .on(
                    "mount",
                    &[],
                    [
                        CommandOutput::ok(""),
                        CommandOutput::ok(mounted.clone()),
                        CommandOutput::ok(mounted),
                        CommandOutput::ok(""),
                    ],
                )
                .on("rsync", &[], [rsync])
        }
    }

    fn exclude_file(runner: &ScriptedRunner) -> PathBuf {
        let call = &runner.calls_to("rsync", &[])[0];
        let arg = call
            .args
            .iter()
            .find_map(|a| a.strip_prefix("--exclude-from="))
            .unwrap();
        PathBuf::from(arg)
    }

    #[test]
    fn test_full_run() {
        let fixture = Fixture::new();
        let runner = fixture.runner(CommandOutput::ok(""));

        let summary = Orchestrator::new(&runner).run(&fixture.config()).unwrap();
        assert_eq!(summary, RunSummary { total: 1, changed: 1 });

        let dst = fixture.mount_root.join("Backup").join("laptop");
        assert!(dst.join("Documents").is_dir());
        assert_eq!(runner.calls_to("diskutil", &["unmount"]).len(), 1);
        assert!(!exclude_file(&runner).exists());
    }

    #[test]
    fn test_missing_source_stops_before_the_volume() {
        let fixture = Fixture::new();
        let mut config = fixture.config();
        config.src = fixture.src.join("missing");
        let runner = fixture.runner(CommandOutput::ok(""));

        let err = Orchestrator::new(&runner).run(&config).unwrap_err();
        assert!(err.is_config());
        assert_eq!(err.to_string(), "Configuration error: Base source directory not mounted");
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_missing_device() {
        let fixture = Fixture::new();
        let mut config = fixture.config();
        config.device_name = None;
        let runner = fixture.runner(CommandOutput::ok(""));

        let err = Orchestrator::new(&runner).run(&config).unwrap_err();
        assert!(err.to_string().contains("Device not provided"));
    }

    #[test]
    fn test_sync_failure_still_cleans_up() {
        let fixture = Fixture::new();
        let runner = fixture.runner(CommandOutput::failed(23, "partial transfer"));

        let err = Orchestrator::new(&runner).run(&fixture.config()).unwrap_err();
        assert!(matches!(err, BackupError::SyncTool { status: 23, .. }));
        assert_eq!(runner.calls_to("diskutil", &["unmount"]).len(), 1);
        assert!(!exclude_file(&runner).exists());
    }

    #[test]
    fn test_resolver_prefers_configured_secret() {
        let device = DeviceConfig {
            name: "Backup".into(),
            pass: Some("inline".into()),
            ..Default::default()
        };
        let resolved = passphrase_resolver(&device, true)().unwrap();
        assert_eq!(resolved, Some(Passphrase::new("inline")));

        let resolved = passphrase_resolver(&DeviceConfig::named("Backup"), false)().unwrap();
        assert_eq!(resolved, None);
    }
}
