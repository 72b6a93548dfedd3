//! API harness - a sequential integration-test harness for HTTP APIs
//!
//! Issues a scenario of checks one at a time, threads an auth session
//! through them, and records every outcome in an ordered ledger.

pub mod cli;
pub mod commands;
pub mod common;
pub mod executor;
pub mod http;
pub mod ledger;
pub mod report;
pub mod scenario;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use executor::{Check, CheckOutcome, Executor};
pub use ledger::{Ledger, SessionState, TestResult};
