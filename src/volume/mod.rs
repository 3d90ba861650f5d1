//! Backup volume lifecycle
//!
//! A [`Volume`] is the named external disk snapshots are written to. It can
//! be a plain partition, an encrypted CoreStorage logical volume or a disk
//! image, and moves through the states
//!
//! ```text
//! Detached -> Locked -> Unlocked -> Mounted -> (unmount) -> Unlocked
//!                \__________________/
//!                  plain devices skip Locked
//! ```
//!
//! Everything is observed through the host's `diskutil`, `hdiutil` and
//! `mount` tools; the mount table is the source of truth for whether a
//! mount or unmount worked.

mod diskutil;
mod guard;

pub use guard::{mount_volume, MountedVolume};

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::crypto::Passphrase;
use crate::error::{BackupError, BackupResult};
use crate::process::{run_checked, run_probe, CommandRunner};

/// How a volume is unlocked and mounted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeKind {
    /// Ordinary partition, mounted by name
    PlainDevice,
    /// CoreStorage logical volume, unlocked through its UUID
    EncryptedContainer { lv_uuid: String },
    /// Disk image, attached with the passphrase on stdin
    DiskImage { image: PathBuf },
}

impl fmt::Display for VolumeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlainDevice => write!(f, "device"),
            Self::EncryptedContainer { lv_uuid } => write!(f, "encrypted container {}", lv_uuid),
            Self::DiskImage { image } => write!(f, "disk image {}", image.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeState {
    Detached,
    Locked,
    Unlocked,
    Mounted,
}

impl fmt::Display for VolumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Detached => "detached",
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::Mounted => "mounted",
        };
        write!(f, "{}", s)
    }
}

/// One named backup volume
pub struct Volume<R: CommandRunner> {
    runner: R,
    name: String,
    mount_point: PathBuf,
    kind: VolumeKind,
    /// Lock status probe output, dropped after every unlock attempt
    info: Option<BTreeMap<String, String>>,
}

impl<R: CommandRunner> Volume<R> {
    /// Open the volume described by `device`, mounted under `mount_root`
    ///
    /// A device with an `image` is a disk image. Otherwise, if the device is
    /// attached, it is probed for a CoreStorage logical volume: `cs info`
    /// by name only answers for unlocked volumes, so a failure falls back
    /// to scanning `cs list` for the volume's UUID.
    pub fn open(runner: R, device: &DeviceConfig, mount_root: &Path) -> BackupResult<Self> {
        let mut volume = Self {
            runner,
            name: device.name.clone(),
            mount_point: mount_root.join(&device.name),
            kind: VolumeKind::PlainDevice,
            info: None,
        };

        volume.kind = match &device.image {
            Some(image) => VolumeKind::DiskImage {
                image: image.clone(),
            },
            None if volume.is_attached()? => volume.probe_container()?,
            None => VolumeKind::PlainDevice,
        };
        debug!("Volume {} is a {}", volume.name, volume.kind);
        Ok(volume)
    }

    fn probe_container(&mut self) -> BackupResult<VolumeKind> {
        let output = run_probe(&self.runner, &diskutil::cs_info(&self.name))?;
        if output.success() {
            let info = diskutil::parse_key_values(&output.stdout_text());
            if let Some(uuid) = info.get("UUID").cloned() {
                self.info = Some(info);
                return Ok(VolumeKind::EncryptedContainer { lv_uuid: uuid });
            }
        }

        let listing = run_probe(&self.runner, &diskutil::cs_list())?;
        if !listing.success() {
            return Ok(VolumeKind::PlainDevice);
        }
        Ok(
            match diskutil::find_logical_volume_uuid(&listing.stdout_text(), &self.name) {
                Some(lv_uuid) => VolumeKind::EncryptedContainer { lv_uuid },
                None => VolumeKind::PlainDevice,
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &VolumeKind {
        &self.kind
    }

    /// Where the volume is (or will be) mounted
    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    /// Is the device present on this machine?
    pub fn is_attached(&self) -> BackupResult<bool> {
        match &self.kind {
            VolumeKind::DiskImage { image } => Ok(image.exists()),
            _ => {
                let output = run_checked(&self.runner, &diskutil::list())?;
                Ok(diskutil::listing_mentions(&output.stdout_text(), &self.name))
            }
        }
    }

    /// Device node currently mounted at the mount point
    pub fn device_node(&self) -> BackupResult<Option<String>> {
        let output = run_checked(&self.runner, &diskutil::mounts())?;
        Ok(diskutil::mounted_device(&output.stdout_text(), &self.mount_point))
    }

    pub fn is_mounted(&self) -> BackupResult<bool> {
        Ok(self.device_node()?.is_some())
    }

    /// Does mounting need a passphrase first?
    pub fn is_locked(&mut self) -> BackupResult<bool> {
        match self.kind {
            VolumeKind::PlainDevice => Ok(false),
            VolumeKind::EncryptedContainer { .. } => Ok(self
                .info()?
                .get("LV Status")
                .map(|status| status == diskutil::LV_LOCKED)
                .unwrap_or(false)),
            VolumeKind::DiskImage { .. } => Ok(diskutil::reports_encrypted(self.info()?)),
        }
    }

    pub fn state(&mut self) -> BackupResult<VolumeState> {
        if !self.is_attached()? {
            return Ok(VolumeState::Detached);
        }
        if self.is_mounted()? {
            return Ok(VolumeState::Mounted);
        }
        if self.is_locked()? {
            Ok(VolumeState::Locked)
        } else {
            Ok(VolumeState::Unlocked)
        }
    }

    /// Lock status probe, cached until the next unlock attempt
    ///
    /// A failing probe reads as "no information", i.e. not locked.
    fn info(&mut self) -> BackupResult<&BTreeMap<String, String>> {
        if self.info.is_none() {
            let cmd = match &self.kind {
                VolumeKind::PlainDevice => None,
                VolumeKind::EncryptedContainer { lv_uuid } => Some(diskutil::cs_info(lv_uuid)),
                VolumeKind::DiskImage { image } => Some(diskutil::image_is_encrypted(image)),
            };
            let mut info = BTreeMap::new();
            if let Some(cmd) = cmd {
                let output = run_probe(&self.runner, &cmd)?;
                if output.success() {
                    info = diskutil::parse_key_values(&output.stdout_text());
                }
            }
            self.info = Some(info);
        }
        Ok(self.info.get_or_insert_with(BTreeMap::new))
    }

    /// Unlock an encrypted container
    ///
    /// Returns whether the volume reports itself unlocked afterwards.
    /// Other volume kinds have nothing to unlock.
    pub fn unlock(&mut self, passphrase: &Passphrase) -> BackupResult<bool> {
        let uuid = match &self.kind {
            VolumeKind::EncryptedContainer { lv_uuid } => lv_uuid.clone(),
            _ => return Ok(true),
        };

        info!("Unlocking {}", self.name);
        let output = run_probe(&self.runner, &diskutil::cs_unlock(&uuid, passphrase));
        self.info = None;
        let output = output?;
        if !output.success() {
            warn!("Unlocking {} failed: {}", self.name, output.combined().trim());
        }
        Ok(!self.is_locked()?)
    }

    /// Mount the volume, unlocking it first when needed
    ///
    /// Returns whether the mount table shows the volume afterwards; the
    /// exit status of the mount tool only shows up in the log.
    pub fn mount(&mut self, passphrase: Option<&Passphrase>) -> BackupResult<bool> {
        let cmd = match self.kind.clone() {
            VolumeKind::PlainDevice => diskutil::mount(&self.name),
            VolumeKind::EncryptedContainer { .. } => {
                if self.is_locked()? {
                    let passphrase = self.require(passphrase)?;
                    if !self.unlock(passphrase)? {
                        return Err(BackupError::device(format!(
                            "Failed to unlock {}",
                            self.name
                        )));
                    }
                }
                diskutil::mount(&self.name)
            }
            VolumeKind::DiskImage { image } => {
                let passphrase = if self.is_locked()? {
                    Some(self.require(passphrase)?)
                } else {
                    None
                };
                diskutil::image_attach(&image, &self.mount_point, passphrase)
            }
        };

        info!("Mounting {}", self.name);
        let output = run_probe(&self.runner, &cmd)?;
        if let VolumeKind::DiskImage { .. } = self.kind {
            self.info = None;
            if let Some(dev) = diskutil::attached_device(&output.stdout_text()) {
                debug!("Attached {} as /dev/{}", self.name, dev);
            }
        }
        if !output.success() {
            warn!("{}: {}", cmd.render(), output.combined().trim());
        }

        let mounted = self.is_mounted()?;
        if !mounted {
            warn!("{} is not in the mount table after mounting", self.name);
        }
        Ok(mounted)
    }

    fn require<'p>(&self, passphrase: Option<&'p Passphrase>) -> BackupResult<&'p Passphrase> {
        passphrase.ok_or_else(|| {
            BackupError::config(format!(
                "Encrypted disk {} needs password to be mounted",
                self.name
            ))
        })
    }

    /// Unmount the volume if it is mounted
    ///
    /// Fails when the volume is still in the mount table afterwards.
    pub fn unmount(&mut self) -> BackupResult<()> {
        let node = match self.device_node()? {
            Some(node) => node,
            None => {
                debug!("{} is not mounted", self.name);
                return Ok(());
            }
        };

        let cmd = match &self.kind {
            VolumeKind::DiskImage { .. } => diskutil::image_detach(&node),
            _ => diskutil::unmount(&self.name),
        };
        info!("Unmounting {}", self.name);
        let output = run_probe(&self.runner, &cmd)?;

        if self.is_mounted()? {
            let mut message = format!("Backup disk {} is still mounted after unmount", self.name);
            if !output.success() {
                message.push_str(&format!(": {}", output.combined().trim()));
            }
            return Err(BackupError::DeviceState(message));
        }
        Ok(())
    }
}
