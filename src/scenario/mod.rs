//! Scenarios
//!
//! A scenario is an ordered list of steps, each tagged with what it
//! needs from the session. The runner turns that data into checks for
//! the executor.

pub mod builtin;
mod config;
mod runner;
pub mod template;

pub use config::*;
pub use runner::{gate, materialize, RunContext, RunReport, Runner, SkipReason};
pub use template::Variables;
