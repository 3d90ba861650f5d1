//! diskutil, hdiutil and mount plumbing
//!
//! Command builders and pure parsers for the output of the host's
//! volume-management tools.

use std::collections::BTreeMap;
use std::path::Path;

use crate::crypto::Passphrase;
use crate::process::CommandLine;

pub const DISKUTIL: &str = "diskutil";
pub const HDIUTIL: &str = "hdiutil";
pub const MOUNT: &str = "mount";

/// Status value of a locked CoreStorage logical volume
pub const LV_LOCKED: &str = "Locked";

pub fn list() -> CommandLine {
    CommandLine::new(DISKUTIL).arg("list")
}

pub fn mounts() -> CommandLine {
    CommandLine::new(MOUNT)
}

pub fn cs_info(name_or_uuid: &str) -> CommandLine {
    CommandLine::new(DISKUTIL).args(["cs", "info", name_or_uuid])
}

pub fn cs_list() -> CommandLine {
    CommandLine::new(DISKUTIL).args(["cs", "list"])
}

pub fn cs_unlock(uuid: &str, passphrase: &Passphrase) -> CommandLine {
    CommandLine::new(DISKUTIL)
        .args(["cs", "unlockVolume", uuid, "-stdinpassphrase"])
        .stdin_secret(passphrase)
}

pub fn mount(name: &str) -> CommandLine {
    CommandLine::new(DISKUTIL).args(["mount", name])
}

pub fn unmount(name: &str) -> CommandLine {
    CommandLine::new(DISKUTIL).args(["unmount", name])
}

pub fn image_is_encrypted(image: &Path) -> CommandLine {
    CommandLine::new(HDIUTIL).arg("isencrypted").arg(image)
}

/// Attach a disk image at `mount_point`, reading the passphrase from stdin
pub fn image_attach(image: &Path, mount_point: &Path, passphrase: Option<&Passphrase>) -> CommandLine {
    let mut cmd = CommandLine::new(HDIUTIL).arg("attach");
    if passphrase.is_some() {
        cmd = cmd.arg("-stdinpass");
    }
    cmd = cmd.arg(image).arg("-mountpoint").arg(mount_point);
    match passphrase {
        Some(pass) => cmd.stdin_secret(pass),
        None => cmd,
    }
}

pub fn image_detach(device_node: &str) -> CommandLine {
    CommandLine::new(HDIUTIL).args(["detach", device_node])
}

/// Does the device listing mention a volume called `name`?
///
/// The name must appear as its own space-delimited word.
pub fn listing_mentions(listing: &str, name: &str) -> bool {
    let needle = format!(" {} ", name);
    listing
        .lines()
        .any(|line| format!(" {} ", line.trim_end()).contains(&needle))
}

/// Parse `Key: value` lines into a map
pub fn parse_key_values(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Find the logical volume UUID of `name` in `diskutil cs list` output
///
/// The listing nests a `Logical Volume <uuid>` header above the
/// `LV Name: <name>` line of the same volume, so the scan finds the name
/// line first and then walks back up to the nearest header.
pub fn find_logical_volume_uuid(cs_listing: &str, name: &str) -> Option<String> {
    let lines: Vec<&str> = cs_listing.lines().collect();
    let name_at = lines.iter().rposition(|line| {
        line.trim()
            .strip_prefix("LV Name:")
            .map(|value| value.trim() == name)
            .unwrap_or(false)
    })?;

    lines[..name_at]
        .iter()
        .rev()
        .find(|line| line.contains("Logical Volume "))
        .and_then(|line| line.split_whitespace().last())
        .map(str::to_string)
}

/// Device node mounted at `mount_point` according to `mount` output
///
/// Lines look like `/dev/disk4s1 on /Volumes/Backup (apfs, local)`.
pub fn mounted_device(mount_output: &str, mount_point: &Path) -> Option<String> {
    let prefix = format!("{} ", mount_point.display());
    mount_output.lines().find_map(|line| {
        let rest = line.strip_prefix("/dev/")?;
        let (device, tail) = rest.split_once(" on ")?;
        if tail.starts_with(&prefix) {
            Some(device.to_string())
        } else {
            None
        }
    })
}

/// Whole-disk node from the first line of `hdiutil attach` output
pub fn attached_device(attach_output: &str) -> Option<String> {
    attach_output
        .lines()
        .next()?
        .split_whitespace()
        .next()
        .map(|dev| dev.trim_start_matches("/dev/").to_string())
}

/// Does `hdiutil isencrypted` say yes?
pub fn reports_encrypted(info: &BTreeMap<String, String>) -> bool {
    info.get("encrypted").map(|v| v == "YES").unwrap_or(false)
}
