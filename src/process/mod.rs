//! Command runner
//!
//! The only place where rsync-backup starts other programs. Everything else
//! talks to the [`CommandRunner`] trait so the decision logic can be tested
//! against scripted answers.

#[cfg(test)]
pub(crate) mod mock;
mod runner;

pub use runner::{
    run_checked, run_probe, spawn_error, CommandLine, CommandOutput, CommandRunner, SystemRunner,
};
