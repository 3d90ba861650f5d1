//! Scoped mounting

use std::path::Path;

use log::{debug, error, info};

use super::Volume;
use crate::crypto::Passphrase;
use crate::error::{BackupError, BackupResult};
use crate::process::CommandRunner;

/// A mounted volume that is unmounted when the guard goes away
///
/// Use [`MountedVolume::release`] on the normal path so an unmount failure
/// reaches the caller; dropping the guard only logs it.
pub struct MountedVolume<R: CommandRunner> {
    volume: Volume<R>,
    armed: bool,
}

impl<R: CommandRunner> MountedVolume<R> {
    fn new(volume: Volume<R>) -> Self {
        Self {
            volume,
            armed: true,
        }
    }

    pub fn volume(&self) -> &Volume<R> {
        &self.volume
    }

    pub fn mount_point(&self) -> &Path {
        self.volume.mount_point()
    }

    /// Unmount now and report failure
    pub fn release(mut self) -> BackupResult<()> {
        self.armed = false;
        self.volume.unmount()
    }

    /// Leave the volume mounted
    pub fn keep_mounted(mut self) {
        self.armed = false;
    }
}

impl<R: CommandRunner> Drop for MountedVolume<R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.volume.unmount() {
            error!("Failed to unmount {}: {}", self.volume.name(), e);
        }
    }
}

/// Bring `volume` to the mounted state
///
/// `passphrase` is only consulted when the volume turns out to be locked.
/// A locked volume without a passphrase is left untouched.
pub fn mount_volume<R, F>(mut volume: Volume<R>, passphrase: F) -> BackupResult<MountedVolume<R>>
where
    R: CommandRunner,
    F: FnOnce() -> BackupResult<Option<Passphrase>>,
{
    if !volume.is_attached()? {
        return Err(BackupError::device(format!(
            "Backup disk {} is not attached",
            volume.name()
        )));
    }

    if volume.is_mounted()? {
        debug!("{} is already mounted", volume.name());
        return Ok(MountedVolume::new(volume));
    }

    let passphrase = if volume.is_locked()? {
        match passphrase()? {
            Some(passphrase) => Some(passphrase),
            None => {
                return Err(BackupError::config(format!(
                    "Encrypted disk {} needs password to be mounted",
                    volume.name()
                )))
            }
        }
    } else {
        None
    };

    if !volume.mount(passphrase.as_ref())? {
        return Err(BackupError::device(format!(
            "Could not mount Backup disk {}",
            volume.name()
        )));
    }
    info!("Mounted {} at {}", volume.name(), volume.mount_point().display());
    Ok(MountedVolume::new(volume))
}
