//! Session state and result ledger
//!
//! The ledger is the ordered, append-only record of every check issued
//! in a run. The session holds whatever credentials the last successful
//! authenticating call returned.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::common::config::AuthFields;
use crate::common::truncate_snippet;
use crate::http::Method;
use crate::report;

/// What was kept of a response body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseCapture {
    /// Body decoded as JSON
    Json(Value),
    /// Body that was not JSON, truncated
    Text(String),
}

impl ResponseCapture {
    /// Decode a body as JSON, falling back to a truncated text snapshot
    pub fn from_body(body: &str, max_chars: usize) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => ResponseCapture::Json(value),
            Err(_) => ResponseCapture::Text(truncate_snippet(body, max_chars)),
        }
    }

    /// The value handed back to the caller of a check.
    ///
    /// Text snapshots are wrapped as `{"text": ...}`.
    pub fn to_value(&self) -> Value {
        match self {
            ResponseCapture::Json(value) => value.clone(),
            ResponseCapture::Text(text) => {
                let mut map = Map::new();
                map.insert("text".to_string(), Value::String(text.clone()));
                Value::Object(map)
            }
        }
    }
}

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub name: String,
    pub endpoint: String,
    pub method: Method,
    pub expected_status: u16,
    /// Absent when the request never completed
    pub actual_status: Option<u16>,
    pub success: bool,
    pub response: Option<ResponseCapture>,
    pub error: Option<String>,
}

impl TestResult {
    /// Result for a request that completed with some status
    pub fn completed(
        name: &str,
        endpoint: &str,
        method: Method,
        expected_status: u16,
        actual_status: u16,
        response: ResponseCapture,
    ) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            method,
            expected_status,
            actual_status: Some(actual_status),
            success: actual_status == expected_status,
            response: Some(response),
            error: None,
        }
    }

    /// Result for a request that failed below the HTTP level
    pub fn transport_failure(
        name: &str,
        endpoint: &str,
        method: Method,
        expected_status: u16,
        error: String,
    ) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            method,
            expected_status,
            actual_status: None,
            success: false,
            response: None,
            error: Some(error),
        }
    }
}

/// Run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub attempted: usize,
    pub passed: usize,
}

/// Final verdict plus the rendered summary block
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub overall_pass: bool,
    pub report: String,
}

/// Ordered, append-only collection of check outcomes
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    results: Vec<TestResult>,
    counters: RunCounters,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result and bump the counters
    pub fn record(&mut self, result: TestResult) {
        self.counters.attempted += 1;
        if result.success {
            self.counters.passed += 1;
        }
        self.results.push(result);
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    /// Failed results in insertion order
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn all_passed(&self) -> bool {
        self.counters.passed == self.counters.attempted
    }

    pub fn summarize(&self, snippet_chars: usize) -> Summary {
        Summary {
            overall_pass: self.all_passed(),
            report: report::summary_block(self, snippet_chars),
        }
    }
}

/// Credentials carried between checks
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SessionState {
    token: Option<String>,
    identity: Option<Map<String, Value>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn identity(&self) -> Option<&Map<String, Value>> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Replace the session wholesale
    pub fn adopt(&mut self, token: String, identity: Map<String, Value>) {
        self.token = Some(token);
        self.identity = Some(identity);
    }

    /// Adopt credentials from a response if it carries both a token and an
    /// identity object. Returns whether the session changed.
    pub fn adopt_from_response(&mut self, response: &Value, fields: &AuthFields) -> bool {
        match extract_credentials(response, fields) {
            Some((token, identity)) => {
                self.adopt(token, identity);
                true
            }
            None => false,
        }
    }

    /// Look up a string field on the identity object
    pub fn identity_str(&self, field: &str) -> Option<&str> {
        self.identity.as_ref()?.get(field)?.as_str()
    }
}

/// Pull a token and identity out of a response.
///
/// The token must be a non-empty string and the identity a JSON object;
/// anything else counts as absent.
pub fn extract_credentials(
    response: &Value,
    fields: &AuthFields,
) -> Option<(String, Map<String, Value>)> {
    let token = match response.get(&fields.token_field) {
        Some(Value::String(token)) if !token.is_empty() => token.clone(),
        Some(Value::String(_)) => {
            tracing::debug!(field = %fields.token_field, "Token field is empty");
            return None;
        }
        Some(other) => {
            tracing::debug!(field = %fields.token_field, value = %other, "Token field is not a string");
            return None;
        }
        None => return None,
    };

    let identity = match response.get(&fields.identity_field) {
        Some(Value::Object(identity)) => identity.clone(),
        Some(_) => {
            tracing::debug!(field = %fields.identity_field, "Identity field is not an object");
            return None;
        }
        None => return None,
    };

    Some((token, identity))
}
