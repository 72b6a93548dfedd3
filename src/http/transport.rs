//! Transport layer
//!
//! The `Transport` trait is the only place a check touches the network.
//! Every failure comes back as a `TransportError` value so the executor
//! can record it like any other outcome.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

use super::request::{HttpRequest, HttpResponse, Method, RequestBody};
use crate::common::config::Timeouts;
use crate::common::{Error, Result};

/// Failures below the HTTP status level
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Other(String),
}

/// Sends one request and waits for its response
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

/// Transport backed by a shared reqwest client
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeouts: &Timeouts) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent("api-harness");

        if let Some(timeout) = timeouts.request() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = timeouts.connect() {
            builder = builder.connect_timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        Ok(Self { client })
    }

    fn build(
        &self,
        request: &HttpRequest,
    ) -> std::result::Result<reqwest::RequestBuilder, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .headers(build_headers(&request.headers)?);

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => {
                let bytes = serde_json::to_vec(value)
                    .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
                builder.body(bytes)
            }
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Multipart { fields, file } => {
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                let mut part = reqwest::multipart::Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone());
                if let Some(content_type) = &file.content_type {
                    part = part.mime_str(content_type).map_err(|e| {
                        TransportError::InvalidRequest(format!(
                            "Invalid content type '{}': {}",
                            content_type, e
                        ))
                    })?;
                }
                builder.multipart(form.part(file.field.clone(), part))
            }
        };

        Ok(builder)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let builder = self.build(request)?;

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(classify)?;

        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn build_headers(input: &[(String, String)]) -> std::result::Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();

    for (key, value) in input {
        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            TransportError::InvalidRequest(format!("Invalid header name `{}`: {}", key, e))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            TransportError::InvalidRequest(format!("Invalid header value for `{}`: {}", key, e))
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

/// Map a reqwest error onto the transport taxonomy, keeping the full cause chain
fn classify(err: reqwest::Error) -> TransportError {
    let message = error_chain(&err);
    if err.is_timeout() {
        TransportError::Timeout(message)
    } else if err.is_connect() {
        TransportError::Connect(message)
    } else if err.is_builder() {
        TransportError::InvalidRequest(message)
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(message)
    } else {
        TransportError::Other(message)
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::{assemble_headers, FilePayload};
    use std::time::{Duration, Instant};

    #[test]
    fn test_build_headers_rejects_bad_name() {
        let err = build_headers(&[("bad header".to_string(), "x".to_string())]).unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }

    #[test]
    fn test_build_headers_accepts_bearer() {
        let headers =
            build_headers(&[("Authorization".to_string(), "Bearer abc".to_string())]).unwrap();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer abc");
    }

    fn get(url: String) -> HttpRequest {
        HttpRequest {
            method: Method::Get,
            url,
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    fn transport(request_secs: u64) -> ReqwestTransport {
        ReqwestTransport::new(&Timeouts {
            request_secs,
            connect_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_multipart_carries_single_content_type() {
        let explicit = vec![("Content-Type".to_string(), "multipart/form-data".to_string())];
        let request = HttpRequest {
            method: Method::Post,
            url: "http://svc.test/api/documents".to_string(),
            headers: assemble_headers(&explicit, None, true, false),
            body: RequestBody::Multipart {
                fields: vec![("kind".to_string(), "id".to_string())],
                file: FilePayload {
                    field: "file".to_string(),
                    file_name: "id.png".to_string(),
                    content_type: Some("image/png".to_string()),
                    bytes: vec![0x89, 0x50],
                },
            },
        };

        let built = transport(5).build(&request).unwrap().build().unwrap();
        let content_types: Vec<_> = built
            .headers()
            .get_all(reqwest::header::CONTENT_TYPE)
            .iter()
            .collect();
        assert_eq!(content_types.len(), 1);
        assert!(content_types[0]
            .to_str()
            .unwrap()
            .starts_with("multipart/form-data; boundary="));
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_connect_error() {
        let err = transport(5)
            .send(&get("http://does-not-exist.invalid/health".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_refused_port_is_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = transport(5)
            .send(&get(format!("http://{}/health", addr)))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_silent_server_hits_request_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let started = Instant::now();
        let err = transport(1)
            .send(&get(format!("http://{}/slow", addr)))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();
        server.abort();

        assert!(matches!(err, TransportError::Timeout(_)), "got {:?}", err);
        assert!(elapsed >= Duration::from_millis(900), "returned after {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(3), "returned after {:?}", elapsed);
    }
}
