//! Passphrase handling for encrypted backup volumes
//!
//! rsync-backup implements no cryptography of its own; unlocking is done by
//! the host's volume-management tools. This module only resolves the
//! passphrase and keeps it out of memory dumps and logs.

pub mod secret;
pub mod secure_memory;

pub use secret::{resolve_passphrase, SecretSource};
pub use secure_memory::Passphrase;

use crate::error::{BackupError, BackupResult};

/// Prompt for a passphrase on the terminal (hidden input)
pub fn prompt_passphrase(device_name: &str) -> BackupResult<Passphrase> {
    rpassword::prompt_password(format!("Passphrase for {}: ", device_name))
        .map(Passphrase::from)
        .map_err(|e| BackupError::config(format!("Failed to read passphrase: {}", e)))
}
