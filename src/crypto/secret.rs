//! Passphrase resolution for locked volumes
//!
//! A device entry can carry its passphrase inline (`pass`), or point at a
//! secret file (`path`). A secret file is either plain text, whose first
//! line is the passphrase, or a YAML map selected by a `.yml`/`.yaml`
//! extension, in which case `pass` names the key to read.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use super::secure_memory::Passphrase;
use crate::config::DeviceConfig;
use crate::error::{BackupError, BackupResult};

/// Where the passphrase of a device comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Passphrase written in the configuration itself
    Inline(Passphrase),
    /// First line of a plain-text file
    PlainFile(PathBuf),
    /// Named key inside a YAML map
    YamlFile { path: PathBuf, key: Option<String> },
}

impl SecretSource {
    /// Work out the secret source of a device, if it has one
    pub fn from_device(device: &DeviceConfig) -> Option<Self> {
        match (&device.path, &device.pass) {
            (Some(path), key) if is_yaml(path) => Some(Self::YamlFile {
                path: path.clone(),
                key: key.clone(),
            }),
            (Some(path), _) => Some(Self::PlainFile(path.clone())),
            (None, Some(pass)) => Some(Self::Inline(Passphrase::new(pass.clone()))),
            (None, None) => None,
        }
    }

    /// Read the passphrase
    pub fn read(&self, device_name: &str) -> BackupResult<Passphrase> {
        match self {
            Self::Inline(pass) => Ok(pass.clone()),
            Self::PlainFile(path) => {
                debug!("Reading passphrase from plain text file {}", path.display());
                let content = read_secret_file(path)?;
                let first = content.lines().next().unwrap_or("");
                if first.is_empty() {
                    return Err(BackupError::config(format!(
                        "Password file {} is empty",
                        path.display()
                    )));
                }
                Ok(Passphrase::new(first))
            }
            Self::YamlFile { path, key } => {
                debug!("Reading passphrase from yml file {}", path.display());
                let key = key.as_deref().ok_or_else(|| {
                    BackupError::config(format!(
                        "Device {} reads its password from {} but 'pass' does not name a key",
                        device_name,
                        path.display()
                    ))
                })?;
                let content = read_secret_file(path)?;
                let mut secrets: BTreeMap<String, String> = serde_yaml::from_str(&content)
                    .map_err(|e| {
                        BackupError::config(format!(
                            "Cannot parse password file {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                secrets.remove(key).map(Passphrase::new).ok_or_else(|| {
                    BackupError::config(format!(
                        "Cannot find password for backup disk {} in yml file {}",
                        device_name,
                        path.display()
                    ))
                })
            }
        }
    }
}

/// Resolve the configured passphrase of a device
///
/// Returns `Ok(None)` when the device has no secret configured at all.
pub fn resolve_passphrase(device: &DeviceConfig) -> BackupResult<Option<Passphrase>> {
    SecretSource::from_device(device)
        .map(|source| source.read(&device.name))
        .transpose()
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

fn read_secret_file(path: &Path) -> BackupResult<String> {
    if !path.is_file() {
        return Err(BackupError::config(format!(
            "Cannot read backup device password file {}",
            path.display()
        )));
    }
    fs::read_to_string(path).map_err(|e| {
        BackupError::config(format!(
            "Cannot read backup device password file {}: {}",
            path.display(),
            e
        ))
    })
}
