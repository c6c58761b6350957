//! Outbound response types and the per-request response carrier.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const IM_A_TEAPOT: StatusCode = StatusCode(418);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    pub const BAD_GATEWAY: StatusCode = StatusCode(502);

    /// Check if the status code indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Check if the status code indicates a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    /// Check if the status code indicates a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::OK
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

/// Multi-valued header map with case-insensitive keys.
///
/// Keys are normalized to lowercase on insertion and lookup. Repeated
/// `append` calls accumulate values under the same key, which is how
/// multiple `Set-Cookie` headers reach the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headers(HashMap<String, Vec<String>>);

impl Headers {
    /// Create an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all values for `key` with a single value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into().to_lowercase(), vec![value.into()]);
    }

    /// Append a value to `key`, keeping any existing values.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0
            .entry(key.into().to_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Get the first value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(&key.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Get all values for `key`.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0
            .get(&key.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Remove all values for `key`.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.0.remove(&key.to_lowercase())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(&key.to_lowercase())
    }

    /// Iterate over (key, values) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A cookie queued on the response carrier, rendered as one `Set-Cookie`
/// header value when the response is assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Lifetime in seconds.
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    /// Create a new cookie with the given name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Render the `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if let Some(path) = &self.path {
            out.push_str("; Path=");
            out.push_str(path);
        }
        if let Some(domain) = &self.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", max_age));
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

/// A post-processing callback applied to the response carrier after the
/// wrapped function returns and before the response is committed.
pub type ResponseFunc = Box<dyn FnOnce(&mut ResponseParts) + Send + 'static>;

/// Per-request response carrier handed to [`ResponseFunc`] callbacks.
///
/// Callbacks may override the status code, mutate headers, and queue
/// cookies. Mutations are only observable before the dispatcher assembles
/// the final [`Response`]; the carrier is consumed at that point, so
/// nothing can change after the status line is committed.
#[derive(Debug, Default)]
pub struct ResponseParts {
    /// Outgoing status code, 200 unless overridden.
    pub status: StatusCode,
    pub(crate) headers: Headers,
    pub(crate) cookies: Vec<Cookie>,
}

impl ResponseParts {
    /// Create a fresh carrier with a 200 status and no headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// The outgoing header map.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to the outgoing header map.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Queue a cookie to be set on the response.
    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.cookies.push(cookie);
    }
}

/// Outbound HTTP response value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code.
    pub status: StatusCode,
    /// HTTP headers.
    pub headers: Headers,
    /// Response body.
    pub body: Bytes,
}

impl Response {
    /// Create an empty response with the given status code.
    pub fn new(status: impl Into<StatusCode>) -> Self {
        Self {
            status: status.into(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Create a 200 plain-text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(StatusCode::OK)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(content.into())
    }

    /// Create a plain-text error response.
    pub fn error(status: impl Into<StatusCode>, message: impl Into<String>) -> Self {
        Self::new(status)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(message.into())
    }

    /// Replace a header value.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(key, value);
        self
    }

    /// Set the response body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Get the body as text if non-empty.
    pub fn text_body(&self) -> Option<String> {
        if self.body.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.body).to_string())
        }
    }

    /// Parse the body as JSON if non-empty.
    pub fn json_body<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Option<Result<T, serde_json::Error>> {
        if self.body.is_empty() {
            None
        } else {
            Some(serde_json::from_slice(&self.body))
        }
    }
}
