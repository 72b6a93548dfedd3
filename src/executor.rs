//! Request executor
//!
//! Performs exactly one named check, classifies it by status code and
//! appends the outcome to the ledger. Nothing that goes wrong while
//! sending escapes this module: every failure becomes a `TestResult`.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::common::config::{Config, TargetConfig};
use crate::common::{truncate_snippet, Result};
use crate::http::request::{assemble_headers, encode_body, resolve_address};
use crate::http::{FilePayload, HttpRequest, Method, ReqwestTransport, Transport};
use crate::ledger::{Ledger, ResponseCapture, SessionState, TestResult};
use crate::report;

/// One named request plus its expectation
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    pub name: String,
    pub method: Method,
    pub path: String,
    pub expected_status: u16,
    pub body: Option<Value>,
    pub file: Option<FilePayload>,
    pub headers: Vec<(String, String)>,
    pub form: bool,
}

impl Check {
    pub fn new(name: impl Into<String>, method: Method, path: impl Into<String>, expected_status: u16) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            expected_status,
            body: None,
            file: None,
            headers: Vec::new(),
            form: false,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_file(mut self, file: FilePayload) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send the body as url-encoded form fields
    pub fn as_form(mut self) -> Self {
        self.form = true;
        self
    }
}

/// What the caller gets back from a check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub success: bool,
    /// Decoded response, `{"text": ...}` for non-JSON bodies, `{}` after a
    /// transport failure
    pub response: Value,
}

impl CheckOutcome {
    fn transport_failure() -> Self {
        Self {
            success: false,
            response: Value::Object(Map::new()),
        }
    }
}

/// Issues checks against one target through a transport
pub struct Executor {
    transport: Arc<dyn Transport>,
    target: TargetConfig,
    snippet_chars: usize,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>, target: TargetConfig, snippet_chars: usize) -> Self {
        Self {
            transport,
            target,
            snippet_chars,
        }
    }

    /// Build an executor that talks to the network
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.timeouts)?;
        Ok(Self::new(
            Arc::new(transport),
            config.target.clone(),
            config.report.snippet_chars,
        ))
    }

    pub fn target(&self) -> &TargetConfig {
        &self.target
    }

    /// Build the request for a check as the session currently stands
    pub fn build_request(&self, session: &SessionState, check: &Check) -> HttpRequest {
        let is_upload = check.file.is_some();
        HttpRequest {
            method: check.method,
            url: resolve_address(&self.target, &check.path),
            headers: assemble_headers(&check.headers, session.token(), is_upload, check.form),
            body: encode_body(check.method, check.body.as_ref(), check.file.as_ref(), check.form),
        }
    }

    /// Run one check and record it.
    ///
    /// Reads the session but never changes it; adopting credentials from
    /// the response is up to the caller.
    pub async fn execute(&self, session: &SessionState, ledger: &mut Ledger, check: &Check) -> CheckOutcome {
        report::check_started(&check.name);

        let request = self.build_request(session, check);
        tracing::debug!(method = %request.method, url = %request.url, "Sending request");

        let started = Instant::now();
        let sent = self.transport.send(&request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                let message = e.to_string();
                tracing::debug!(url = %request.url, elapsed_ms, error = %message, "Transport failure");
                report::check_transport_error(&message);
                ledger.record(TestResult::transport_failure(
                    &check.name,
                    &check.path,
                    check.method,
                    check.expected_status,
                    message,
                ));
                return CheckOutcome::transport_failure();
            }
        };

        tracing::debug!(url = %request.url, status = response.status, elapsed_ms, "Response received");

        let capture = ResponseCapture::from_body(&response.body, self.snippet_chars);
        let result = TestResult::completed(
            &check.name,
            &check.path,
            check.method,
            check.expected_status,
            response.status,
            capture,
        );
        let success = result.success;

        if success {
            report::check_passed(response.status);
        } else {
            report::check_status_mismatch(
                check.expected_status,
                response.status,
                &truncate_snippet(&response.body, self.snippet_chars),
            );
        }

        let value = result
            .response
            .as_ref()
            .map(ResponseCapture::to_value)
            .unwrap_or_else(|| Value::Object(Map::new()));
        ledger.record(result);

        CheckOutcome {
            success,
            response: value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::ScriptedTransport;
    use crate::http::{RequestBody, TransportError};
    use serde_json::json;

    fn target() -> TargetConfig {
        TargetConfig {
            base_url: "http://svc.test".to_string(),
            ..TargetConfig::default()
        }
    }

    fn executor(transport: Arc<ScriptedTransport>) -> Executor {
        Executor::new(transport, target(), 200)
    }

    #[tokio::test]
    async fn test_health_check_passes() {
        let transport = Arc::new(ScriptedTransport::new().on_json(
            Method::Get,
            "http://svc.test/health",
            200,
            json!({"status": "healthy"}),
        ));
        let exec = executor(transport.clone());
        let mut ledger = Ledger::new();

        let outcome = exec
            .execute(&SessionState::new(), &mut ledger, &Check::new("Health Check", Method::Get, "../health", 200))
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.response, json!({"status": "healthy"}));
        assert_eq!(ledger.counters().attempted, 1);
        assert_eq!(ledger.counters().passed, 1);
        assert_eq!(ledger.results()[0].endpoint, "../health");
        assert_eq!(transport.requests()[0].url, "http://svc.test/health");
    }

    #[tokio::test]
    async fn test_status_mismatch_recorded() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::Get,
            "http://svc.test/api/dashboard",
            401,
            "Unauthorized",
        ));
        let exec = executor(transport);
        let mut ledger = Ledger::new();

        let outcome = exec
            .execute(&SessionState::new(), &mut ledger, &Check::new("Get Dashboard", Method::Get, "dashboard", 200))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.response, json!({"text": "Unauthorized"}));
        let result = &ledger.results()[0];
        assert_eq!(result.actual_status, Some(401));
        assert!(result.error.is_none());
        assert_eq!(ledger.counters().passed, 0);
    }

    #[tokio::test]
    async fn test_transport_failure_normalized() {
        let transport = Arc::new(ScriptedTransport::new().on_failure(
            Method::Get,
            "http://svc.test/api/states",
            TransportError::Timeout("after 30s".to_string()),
        ));
        let exec = executor(transport);
        let mut ledger = Ledger::new();

        let outcome = exec
            .execute(&SessionState::new(), &mut ledger, &Check::new("Get States", Method::Get, "states", 200))
            .await;

        assert_eq!(outcome, CheckOutcome::transport_failure());
        let result = &ledger.results()[0];
        assert!(!result.success);
        assert_eq!(result.actual_status, None);
        assert!(result.error.as_deref().unwrap().contains("timed out"));
        assert_eq!(ledger.counters().attempted, 1);
    }

    #[tokio::test]
    async fn test_bearer_attached_from_session() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::Get,
            "http://svc.test/api/users/me",
            200,
            "{}",
        ));
        let exec = executor(transport.clone());
        let mut session = SessionState::new();
        session.adopt("abc".to_string(), Map::new());

        exec.execute(&session, &mut Ledger::new(), &Check::new("Me", Method::Get, "users/me", 200))
            .await;

        let sent = &transport.requests()[0];
        assert_eq!(sent.header("Authorization"), Some("Bearer abc"));
        assert_eq!(sent.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_build_request_upload_beats_form() {
        let exec = executor(Arc::new(ScriptedTransport::new()));
        let check = Check::new("Upload", Method::Post, "documents", 200)
            .with_body(json!({"kind": "id"}))
            .with_file(FilePayload {
                field: "file".to_string(),
                file_name: "id.png".to_string(),
                content_type: None,
                bytes: vec![1, 2, 3],
            })
            .as_form();

        let request = exec.build_request(&SessionState::new(), &check);
        assert!(matches!(request.body, RequestBody::Multipart { .. }));
        assert_eq!(request.header("Content-Type"), None);
    }
}
