//! Backup configuration document
//!
//! The YAML document names the source root, the backup volume, the
//! destination below the volume's mount point, the global exclude patterns
//! and the list of directories to back up.
//!
//! ```yaml
//! title: Laptop backup
//! src: /Users/me
//! dst: Backups/laptop
//! device:
//!   name: RsyncBackup
//!   path: /Users/me/.secrets/backup.yml
//!   pass: rsync_backup
//! exclude:
//!   - .DS_Store
//! backups:
//!   - dir: Documents
//!     frequency: hourly
//!   - path: Projects
//!     frequency: daily
//!     skip: [scratch]
//!     configs:
//!       huge:
//!         frequency: weekly
//!         exclude: [build]
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BackupError, BackupResult};
use crate::snapshot::RetentionPolicy;

/// Top-level configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    /// Base source root; every unit source is relative to it
    pub src: PathBuf,

    /// Backup volume with optional secret resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceConfig>,

    /// Backup volume given by name only
    #[serde(
        default,
        rename = "deviceName",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_name: Option<String>,

    /// Destination base, relative to the mounted volume
    pub dst: PathBuf,

    /// Exclude patterns shared by every unit
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Label used in the final summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Units to back up, in order
    #[serde(default)]
    pub backups: Vec<BackupEntry>,

    /// Post desktop notifications for failures and the summary
    #[serde(default)]
    pub notify: bool,

    /// Sync tool program
    #[serde(default = "default_rsync")]
    pub rsync: String,

    /// Directory under which volumes are mounted
    #[serde(default = "default_mount_root")]
    pub mount_root: PathBuf,
}

fn default_rsync() -> String {
    "rsync".to_string()
}

fn default_mount_root() -> PathBuf {
    PathBuf::from("/Volumes")
}

/// Backup volume description
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Volume name
    pub name: String,

    /// Disk image backing the volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,

    /// Secret file (plain text, or YAML when the extension says so)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Inline passphrase, or the key inside a YAML secret file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,
}

impl DeviceConfig {
    /// A device with only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

// `pass` may be a secret, keep it out of Debug output
impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("name", &self.name)
            .field("image", &self.image)
            .field("path", &self.path)
            .field("pass", &self.pass.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// One entry of the `backups` list
///
/// Exactly one of `dir` (a single directory) or `path` (every child
/// directory becomes its own unit) must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<RetentionPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,

    /// Child names to leave out (`path` entries only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip: Vec<String>,

    /// Per-child overrides (`path` entries only)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configs: BTreeMap<String, UnitOverride>,
}

/// The two shapes a [`BackupEntry`] can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind<'a> {
    Dir(&'a Path),
    Path(&'a Path),
}

impl BackupEntry {
    /// Which shape this entry has; call [`BackupEntry::validate`] first
    pub fn kind(&self) -> BackupResult<EntryKind<'_>> {
        match (&self.dir, &self.path) {
            (Some(dir), None) => Ok(EntryKind::Dir(dir)),
            (None, Some(path)) => Ok(EntryKind::Path(path)),
            (Some(_), Some(_)) => Err(BackupError::config(
                "A backup entry cannot have both 'dir' and 'path'",
            )),
            (None, None) => Err(BackupError::config(
                "A backup entry needs either 'dir' or 'path'",
            )),
        }
    }

    /// Policy and excludes shared by every unit of this entry
    pub fn defaults(&self) -> UnitSettings {
        UnitSettings {
            frequency: self.frequency.unwrap_or_default(),
            exclude: self.exclude.clone().unwrap_or_default(),
        }
    }

    /// Settings for one child of a `path` entry
    ///
    /// Keys set in the child's override replace the entry default; the
    /// others are inherited.
    pub fn settings_for(&self, child: &str) -> UnitSettings {
        let mut settings = self.defaults();
        if let Some(over) = self.configs.get(child) {
            if let Some(frequency) = over.frequency {
                settings.frequency = frequency;
            }
            if let Some(exclude) = &over.exclude {
                settings.exclude = exclude.clone();
            }
        }
        settings
    }

    pub fn validate(&self) -> BackupResult<()> {
        match self.kind()? {
            EntryKind::Dir(dir) => {
                if !self.skip.is_empty() || !self.configs.is_empty() {
                    return Err(BackupError::config(format!(
                        "'skip' and 'configs' are only allowed on 'path' entries (dir {})",
                        dir.display()
                    )));
                }
                check_relative(dir)
            }
            EntryKind::Path(path) => check_relative(path),
        }
    }
}

fn check_relative(path: &Path) -> BackupResult<()> {
    if path.is_absolute() {
        return Err(BackupError::config(format!(
            "Backup entry {} must be relative to 'src'",
            path.display()
        )));
    }
    Ok(())
}

/// Per-child overrides of a `path` entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<RetentionPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

/// Resolved policy and excludes of a single unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitSettings {
    pub frequency: RetentionPolicy,
    pub exclude: Vec<String>,
}

impl BackupConfig {
    /// Parse and validate a configuration document
    pub fn from_yaml_str(content: &str) -> BackupResult<Self> {
        let config: BackupConfig = serde_yaml::from_str(content)
            .map_err(|e| BackupError::config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the configuration file at `path`
    pub fn load(path: &Path) -> BackupResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BackupError::config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> BackupResult<()> {
        if self.device.is_some() && self.device_name.is_some() {
            return Err(BackupError::config(
                "Use either 'device' or 'deviceName', not both",
            ));
        }
        if self.dst.is_absolute() {
            return Err(BackupError::config(format!(
                "'dst' ({}) must be relative to the backup volume",
                self.dst.display()
            )));
        }
        if self.rsync.trim().is_empty() {
            return Err(BackupError::config("'rsync' cannot be empty"));
        }
        for entry in &self.backups {
            entry.validate()?;
        }
        Ok(())
    }

    /// The backup volume, from either `device` or `deviceName`
    pub fn device_config(&self) -> BackupResult<DeviceConfig> {
        match (&self.device, &self.device_name) {
            (Some(device), _) if !device.name.trim().is_empty() => Ok(device.clone()),
            (None, Some(name)) if !name.trim().is_empty() => Ok(DeviceConfig::named(name.clone())),
            _ => Err(BackupError::config("Device not provided")),
        }
    }

    /// Title for the summary line
    pub fn summary_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Done")
    }
}
