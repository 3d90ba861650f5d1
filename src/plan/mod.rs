//! Backup plan
//!
//! Turns the configured `backups` list into backup units and runs the
//! retention engine once per unit, counting how many got a new snapshot.

mod exclude;
mod runner;
mod unit;

pub use exclude::ExcludeSet;
pub use runner::{PlanRunner, RunSummary};
pub use unit::{resolve_units, BackupUnit};
