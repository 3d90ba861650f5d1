//! Snapshot retention
//!
//! Every backup unit owns a destination directory holding dated snapshot
//! directories. The engine in this module decides when a new snapshot is
//! due and how to produce it as cheaply as possible.
//!
//! # Layout
//!
//! ```text
//! <volume>/<dst>/Documents/
//!     2024-01-01-0000/    <- full copy
//!     2024-01-02-0900/    <- unchanged files hard-linked to the one above
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use rsync_backup::process::SystemRunner;
//! use rsync_backup::snapshot::{SnapshotEngine, SyncTool};
//!
//! let engine = SnapshotEngine::new(SystemRunner, SyncTool::default());
//! let outcome = engine.evaluate_and_sync(&unit, excludes.for_unit(&unit))?;
//! ```

mod engine;
mod name;
mod policy;
mod rsync;

pub use engine::{Outcome, SkipReason, SnapshotEngine};
pub use name::{list_snapshots, parse_snapshot_name, snapshot_name, Snapshot, SNAPSHOT_FORMAT};
pub use policy::RetentionPolicy;
pub use rsync::{dir_arg, Excludes, SyncTool, TransferStats};
