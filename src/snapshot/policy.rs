//! Retention policies
//!
//! A policy is a named staleness threshold. Once the newest snapshot of a
//! unit is older than the threshold, a new snapshot is due.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::BackupError;

/// Frequency class of a backup unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// One snapshot per hour
    Hourly,
    /// One snapshot per day (default)
    #[default]
    Daily,
    /// One snapshot per week
    Weekly,
    /// One snapshot per 30 days
    Monthly,
    /// One snapshot per 365 days
    Yearly,
}

impl RetentionPolicy {
    pub const ALL: [RetentionPolicy; 5] = [
        Self::Hourly,
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Yearly,
    ];

    /// Threshold in seconds
    pub fn seconds(&self) -> i64 {
        match self {
            Self::Hourly => 3_600,
            Self::Daily => 86_400,
            Self::Weekly => 604_800,
            Self::Monthly => 2_592_000,
            Self::Yearly => 31_536_000,
        }
    }

    /// Threshold as a duration
    pub fn threshold(&self) -> Duration {
        Duration::seconds(self.seconds())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RetentionPolicy {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| {
                BackupError::config(format!(
                    "Unknown frequency '{}', expected one of hourly, daily, weekly, monthly, yearly",
                    s
                ))
            })
    }
}
