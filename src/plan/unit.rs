//! Backup units
//!
//! A unit is one source directory mirrored into one destination directory
//! under one retention policy. `dir` entries give one unit each; `path`
//! entries give one unit per immediate child directory.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::{BackupConfig, BackupEntry, EntryKind, UnitSettings};
use crate::error::{BackupError, BackupResult};
use crate::snapshot::RetentionPolicy;

/// One source/destination pair evaluated by the retention engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupUnit {
    /// Path relative to the source root, used in messages
    pub label: PathBuf,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub policy: RetentionPolicy,
    /// Patterns on top of the global exclude list
    pub excludes: Vec<String>,
}

impl BackupUnit {
    fn new(label: PathBuf, base_src: &Path, base_dst: &Path, settings: UnitSettings) -> Self {
        Self {
            source: base_src.join(&label),
            destination: base_dst.join(&label),
            label,
            policy: settings.frequency,
            excludes: settings.exclude,
        }
    }
}

/// Expand the configured entries into units
///
/// `dir` entries keep their declaration order. Children of a `path` entry
/// come in directory listing order, which is platform dependent.
pub fn resolve_units(
    config: &BackupConfig,
    base_src: &Path,
    base_dst: &Path,
) -> BackupResult<Vec<BackupUnit>> {
    let mut units = Vec::new();
    for entry in &config.backups {
        units.extend(resolve_entry(entry, base_src, base_dst)?);
    }
    Ok(units)
}

fn resolve_entry(
    entry: &BackupEntry,
    base_src: &Path,
    base_dst: &Path,
) -> BackupResult<Vec<BackupUnit>> {
    match entry.kind()? {
        EntryKind::Dir(dir) => Ok(vec![BackupUnit::new(
            dir.to_path_buf(),
            base_src,
            base_dst,
            entry.defaults(),
        )]),
        EntryKind::Path(path) => {
            let parent = base_src.join(path);
            let listing = fs::read_dir(&parent).map_err(|e| {
                BackupError::Io(format!(
                    "Failed to list backup path {}: {}",
                    parent.display(),
                    e
                ))
            })?;

            let mut units = Vec::new();
            for child in listing {
                let child = child.map_err(|e| {
                    BackupError::Io(format!("Failed to read directory entry: {}", e))
                })?;
                if !child.path().is_dir() {
                    continue;
                }
                let name = child.file_name().to_string_lossy().into_owned();
                if entry.skip.iter().any(|s| s == &name) {
                    debug!("Skipping {}/{}", path.display(), name);
                    continue;
                }
                units.push(BackupUnit::new(
                    path.join(&name),
                    base_src,
                    base_dst,
                    entry.settings_for(&name),
                ));
            }
            Ok(units)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(yaml: &str) -> BackupConfig {
        BackupConfig::from_yaml_str(&format!("src: /unused\ndst: x\n{}", yaml)).unwrap()
    }

    #[test]
    fn test_dir_entries_keep_order() {
        let cfg = config(
            "backups:\n  - dir: Documents\n    frequency: hourly\n  - dir: Music\n    exclude: ['*.m4p']\n",
        );
        let units = resolve_units(&cfg, Path::new("/src"), Path::new("/vol/dst")).unwrap();

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].source, PathBuf::from("/src/Documents"));
        assert_eq!(units[0].destination, PathBuf::from("/vol/dst/Documents"));
        assert_eq!(units[0].policy, RetentionPolicy::Hourly);
        assert_eq!(units[1].label, PathBuf::from("Music"));
        assert_eq!(units[1].policy, RetentionPolicy::Daily);
        assert_eq!(units[1].excludes, vec!["*.m4p".to_string()]);
    }

    #[test]
    fn test_path_entry_expands_children() {
        let temp = TempDir::new().unwrap();
        let projects = temp.path().join("Projects");
        for name in ["alpha", "beta", "scratch", "huge"] {
            fs::create_dir_all(projects.join(name)).unwrap();
        }
        fs::write(projects.join("README"), "not a directory").unwrap();

        let cfg = config(
            "backups:\n  - path: Projects\n    frequency: daily\n    exclude: [target]\n    skip: [scratch]\n    configs:\n      huge:\n        frequency: weekly\n",
        );
        let mut units = resolve_units(&cfg, temp.path(), Path::new("/vol")).unwrap();
        units.sort_by(|a, b| a.label.cmp(&b.label));

        let labels: Vec<_> = units.iter().map(|u| u.label.clone()).collect();
        assert_eq!(
            labels,
            vec![
                PathBuf::from("Projects/alpha"),
                PathBuf::from("Projects/beta"),
                PathBuf::from("Projects/huge"),
            ]
        );

        let huge = &units[2];
        assert_eq!(huge.policy, RetentionPolicy::Weekly);
        assert_eq!(huge.excludes, vec!["target".to_string()]);
        assert_eq!(huge.destination, PathBuf::from("/vol/Projects/huge"));
        assert_eq!(huge.source, temp.path().join("Projects/huge"));

        assert_eq!(units[0].policy, RetentionPolicy::Daily);
    }

    #[test]
    fn test_missing_path_is_error() {
        let temp = TempDir::new().unwrap();
        let cfg = config("backups:\n  - path: Nowhere\n");
        assert!(resolve_units(&cfg, temp.path(), Path::new("/vol")).is_err());
    }
}
