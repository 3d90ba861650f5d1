//! Display formatting for terminal output
//!
//! Formats backup plans and volume states as plain text tables.

pub mod plan;

pub use plan::{format_plan, format_volume_status};
