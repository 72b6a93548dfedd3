//! CLI command definitions
//!
//! Defines the clap commands for the API harness.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::http::Method;

/// Options that select and tune the target
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Base URL of the API under test (overrides config and API_HARNESS_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds, 0 to wait indefinitely
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Configuration file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scenario and exit non-zero if any check failed
    Run {
        /// Path to a YAML scenario (default: built-in driving school scenario)
        scenario: Option<PathBuf>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Issue a single check
    Check {
        /// Path under the API namespace, or `../path` for the root namespace
        path: String,

        /// HTTP method
        #[arg(long, short = 'X', default_value = "GET")]
        method: Method,

        /// Expected status code
        #[arg(long, default_value_t = 200)]
        expect: u16,

        /// JSON body to send
        #[arg(long)]
        body: Option<String>,

        /// Send the body as url-encoded form fields
        #[arg(long)]
        form: bool,

        /// Bearer token to attach
        #[arg(long)]
        token: Option<String>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// List the steps of a scenario without sending anything
    Show {
        /// Path to a YAML scenario (default: built-in driving school scenario)
        scenario: Option<PathBuf>,
    },
}
