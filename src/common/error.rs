//! Error types for the API harness
//!
//! These cover setup failures only: loading configuration, reading
//! scenario files, building the HTTP client. Failures of individual
//! checks never surface here; they are recorded in the ledger.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the API harness
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Scenario Errors ===
    #[error("Invalid scenario '{name}': {reason}")]
    InvalidScenario { name: String, reason: String },

    #[error("Failed to parse scenario: {0}")]
    ScenarioParse(#[from] serde_yaml::Error),

    // === HTTP Client Errors ===
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid scenario error
    pub fn invalid_scenario(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidScenario {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a file read error from an IO failure
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_scenario_message() {
        let err = Error::invalid_scenario("smoke", "step 3 has an empty path");
        assert_eq!(
            err.to_string(),
            "Invalid scenario 'smoke': step 3 has an empty path"
        );
    }

    #[test]
    fn test_file_read_message() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err = Error::file_read(std::path::Path::new("/tmp/x.yaml"), &io_err);
        assert!(err.to_string().contains("/tmp/x.yaml"));
        assert!(err.to_string().contains("missing"));
    }
}
