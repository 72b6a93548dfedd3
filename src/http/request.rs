//! Request construction
//!
//! Address resolution, header assembly and body encoding for a single
//! check. Nothing here touches the network.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::common::config::TargetConfig;

/// HTTP methods a check may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Whether requests with this method may carry a body
    pub fn carries_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!(
                "Unsupported method '{}'. Supported: GET, POST, PUT, DELETE",
                other
            )),
        }
    }
}

/// A file attached to a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    /// Multipart field name
    pub field: String,
    /// File name reported to the server
    pub file_name: String,
    /// MIME type of the part, if known
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Encoded request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart {
        fields: Vec<(String, String)>,
        file: FilePayload,
    },
}

/// A fully built request, ready for a transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Resolve a check path to a full URL.
///
/// Paths starting with the root sentinel address the unprefixed namespace
/// (`{base}/{rest}`); all others live under the API prefix
/// (`{base}/{prefix}/{path}`).
pub fn resolve_address(target: &TargetConfig, path: &str) -> String {
    let base = target.base_url.trim_end_matches('/');
    if let Some(rest) = path.strip_prefix(target.root_sentinel.as_str()) {
        return format!("{}/{}", base, rest.trim_start_matches('/'));
    }
    let path = path.trim_start_matches('/');
    if target.api_prefix.is_empty() {
        format!("{}/{}", base, path)
    } else {
        format!("{}/{}/{}", base, target.api_prefix, path)
    }
}

/// Assemble request headers.
///
/// Explicit headers come first. A held token replaces any explicit
/// `Authorization`. Uploads drop any explicit content-type, since the
/// multipart encoder sets its own with the boundary. JSON content-type is
/// added only for plain JSON calls that did not name one themselves.
pub fn assemble_headers(
    explicit: &[(String, String)],
    token: Option<&str>,
    is_upload: bool,
    is_form: bool,
) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = explicit.to_vec();

    if let Some(token) = token {
        headers.retain(|(k, _)| !k.eq_ignore_ascii_case("authorization"));
        headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
    }

    if is_upload {
        headers.retain(|(k, _)| !k.eq_ignore_ascii_case("content-type"));
    }

    let has_content_type = headers
        .iter()
        .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
    if !is_upload && !is_form && !has_content_type {
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }

    headers
}

/// Encode the body of a check.
///
/// GET and DELETE never carry a body. Otherwise the precedence is
/// file payload (multipart), then form flag (url-encoded), then JSON.
pub fn encode_body(
    method: Method,
    body: Option<&Value>,
    file: Option<&FilePayload>,
    form: bool,
) -> RequestBody {
    if !method.carries_body() {
        return RequestBody::Empty;
    }

    if let Some(file) = file {
        return RequestBody::Multipart {
            fields: body.map(form_fields).unwrap_or_default(),
            file: file.clone(),
        };
    }

    if form {
        return RequestBody::Form(body.map(form_fields).unwrap_or_default());
    }

    match body {
        Some(value) => RequestBody::Json(value.clone()),
        None => RequestBody::Empty,
    }
}

/// Flatten a JSON object into form fields.
///
/// Strings are sent verbatim, nulls are dropped, anything else is sent as
/// its JSON text. Non-object bodies produce no fields.
pub fn form_fields(value: &Value) -> Vec<(String, String)> {
    let Some(map) = value.as_object() else {
        return Vec::new();
    };

    map.iter()
        .filter_map(|(k, v)| match v {
            Value::Null => None,
            Value::String(s) => Some((k.clone(), s.clone())),
            other => Some((k.clone(), other.to_string())),
        })
        .collect()
}
