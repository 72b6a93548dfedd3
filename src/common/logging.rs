//! Logging and tracing configuration
//!
//! Diagnostics go to stderr through tracing; the check-by-check report
//! goes to stdout and is not affected by the filter.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for dependencies.
pub fn init_cli(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_directives(verbose))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "harness=debug,api_harness=debug,warn"
    } else {
        "harness=info,api_harness=info,warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        for verbose in [false, true] {
            assert!(EnvFilter::try_new(default_directives(verbose)).is_ok());
        }
    }
}
