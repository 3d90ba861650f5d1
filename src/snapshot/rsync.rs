//! rsync invocation contract
//!
//! Both the dry run and the real run use mirror semantics (`-a` keeps
//! modification times, `--delete` removes files gone from the source, `-m`
//! prunes empty directories) and pass directories with a trailing slash so
//! the source's contents land directly in the target.

use std::ffi::OsString;
use std::path::Path;

use crate::process::CommandLine;

/// Exclude arguments of one invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct Excludes<'a> {
    /// File with one global pattern per line
    pub file: Option<&'a Path>,
    /// Patterns of the unit itself
    pub patterns: &'a [String],
}

/// Builds rsync command lines
#[derive(Debug, Clone)]
pub struct SyncTool {
    program: String,
}

impl Default for SyncTool {
    fn default() -> Self {
        Self::new("rsync")
    }
}

impl SyncTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Statistics-only run comparing `source` with an existing snapshot
    pub fn dry_run_command(
        &self,
        source: &Path,
        reference: &Path,
        excludes: Excludes<'_>,
    ) -> CommandLine {
        CommandLine::new(&self.program)
            .args(["-am", "--stats", "--delete", "--dry-run"])
            .args(exclude_args(excludes))
            .arg(dir_arg(source))
            .arg(dir_arg(reference))
    }

    /// Real run into `target`, hard-linking unchanged files from `link_dest`
    pub fn sync_command(
        &self,
        source: &Path,
        target: &Path,
        link_dest: Option<&Path>,
        excludes: Excludes<'_>,
    ) -> CommandLine {
        let mut cmd = CommandLine::new(&self.program)
            .args(["-am", "--delete"])
            .args(exclude_args(excludes));
        if let Some(link) = link_dest {
            cmd = cmd.arg(flag_with_path("--link-dest=", link));
        }
        cmd.arg(dir_arg(source)).arg(dir_arg(target))
    }
}

fn exclude_args(excludes: Excludes<'_>) -> Vec<OsString> {
    let mut args = Vec::with_capacity(excludes.patterns.len() + 1);
    if let Some(file) = excludes.file {
        args.push(flag_with_path("--exclude-from=", file));
    }
    args.extend(
        excludes
            .patterns
            .iter()
            .map(|p| OsString::from(format!("--exclude={}", p))),
    );
    args
}

fn flag_with_path(flag: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(path.as_os_str());
    arg
}

/// `path` with exactly one trailing slash
pub fn dir_arg(path: &Path) -> OsString {
    let mut arg = path.as_os_str().to_os_string();
    if !arg.to_string_lossy().ends_with('/') {
        arg.push("/");
    }
    arg
}

/// Counters of a `--stats` report
///
/// Deleted and created entries are not "transferred": a source that only
/// lost files, or only gained symlinks or empty directories, still shows
/// zero transferred files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub transferred: u64,
    pub created: u64,
    pub deleted: u64,
}

impl TransferStats {
    /// Read the counters from a `--stats` report
    ///
    /// Understands both the old "Number of files transferred" line and the
    /// newer "Number of regular files transferred" one, with or without
    /// thousands separators. The created and deleted lines only exist in
    /// newer reports and count as zero when missing. Returns `None` when
    /// there is no transferred line at all.
    pub fn parse(stats: &str) -> Option<Self> {
        let mut transferred = None;
        let mut parsed = TransferStats::default();
        for line in stats.lines() {
            let Some((label, value)) = line.split_once(':') else {
                continue;
            };
            match label.trim() {
                "Number of files transferred" | "Number of regular files transferred" => {
                    transferred = stat_value(value);
                }
                "Number of created files" => parsed.created = stat_value(value).unwrap_or(0),
                "Number of deleted files" => parsed.deleted = stat_value(value).unwrap_or(0),
                _ => {}
            }
        }
        parsed.transferred = transferred?;
        Some(parsed)
    }

    /// Would the sync leave the destination exactly as it is?
    pub fn is_unchanged(&self) -> bool {
        self.transferred == 0 && self.created == 0 && self.deleted == 0
    }
}

fn stat_value(value: &str) -> Option<u64> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS_OLD: &str = "\
Number of files: 1234
Number of files transferred: 0
Total file size: 10000 bytes
";

    const STATS_NEW: &str = "\
Number of files: 2,345 (reg: 2,000, dir: 345)
Number of created files: 3 (reg: 3)
Number of deleted files: 0
Number of regular files transferred: 1,203
Total file size: 1.23M bytes
";

    #[test]
    fn test_parse_old_stats() {
        let stats = TransferStats::parse(STATS_OLD).unwrap();
        assert_eq!(stats, TransferStats::default());
        assert!(stats.is_unchanged());
    }

    #[test]
    fn test_parse_new_stats_with_separators() {
        let stats = TransferStats::parse(STATS_NEW).unwrap();
        assert_eq!(stats.transferred, 1203);
        assert_eq!(stats.created, 3);
        assert_eq!(stats.deleted, 0);
        assert!(!stats.is_unchanged());
    }

    #[test]
    fn test_deletions_alone_are_a_change() {
        let stats = TransferStats::parse(
            "Number of files: 9 (reg: 9)\nNumber of created files: 0\nNumber of deleted files: 2 (reg: 2)\nNumber of regular files transferred: 0\n",
        )
        .unwrap();
        assert_eq!(stats.transferred, 0);
        assert_eq!(stats.deleted, 2);
        assert!(!stats.is_unchanged());
    }

    #[test]
    fn test_new_symlink_alone_is_a_change() {
        let stats = TransferStats::parse(
            "Number of created files: 1 (link: 1)\nNumber of deleted files: 0\nNumber of regular files transferred: 0\n",
        )
        .unwrap();
        assert!(!stats.is_unchanged());
    }

    #[test]
    fn test_parse_missing_line() {
        assert_eq!(TransferStats::parse("sent 10 bytes  received 20 bytes"), None);
        assert_eq!(TransferStats::parse("Number of deleted files: 0\n"), None);
    }

    #[test]
    fn test_dir_arg_adds_single_slash() {
        assert_eq!(dir_arg(Path::new("/src/projects")), OsString::from("/src/projects/"));
        assert_eq!(dir_arg(Path::new("/src/projects/")), OsString::from("/src/projects/"));
    }

    #[test]
    fn test_sync_command_layout() {
        let patterns = vec!["*.o".to_string(), "build".to_string()];
        let cmd = SyncTool::default().sync_command(
            Path::new("/src/projects"),
            Path::new("/vol/projects/2024-01-03-0900"),
            Some(Path::new("/vol/projects/2024-01-01-0000")),
            Excludes {
                file: Some(Path::new("/tmp/rsync_backup.exclude")),
                patterns: &patterns,
            },
        );
        assert_eq!(cmd.program(), "rsync");
        assert_eq!(
            cmd.args_lossy(),
            vec![
                "-am",
                "--delete",
                "--exclude-from=/tmp/rsync_backup.exclude",
                "--exclude=*.o",
                "--exclude=build",
                "--link-dest=/vol/projects/2024-01-01-0000",
                "/src/projects/",
                "/vol/projects/2024-01-03-0900/",
            ]
        );
    }

    #[test]
    fn test_sync_command_without_link_dest() {
        let cmd = SyncTool::new("/opt/bin/rsync").sync_command(
            Path::new("/a"),
            Path::new("/b"),
            None,
            Excludes::default(),
        );
        assert_eq!(cmd.program(), "/opt/bin/rsync");
        assert_eq!(cmd.args_lossy(), vec!["-am", "--delete", "/a/", "/b/"]);
    }

    #[test]
    fn test_dry_run_command_layout() {
        let cmd = SyncTool::default().dry_run_command(
            Path::new("/a"),
            Path::new("/b/2024-01-01-0000"),
            Excludes::default(),
        );
        assert_eq!(
            cmd.args_lossy(),
            vec!["-am", "--stats", "--delete", "--dry-run", "/a/", "/b/2024-01-01-0000/"]
        );
    }
}
