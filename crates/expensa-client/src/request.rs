//! Outbound requests and raw responses.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Path prefix of the authentication subsystem (login, logout, refresh,
/// register). Requests under it are never intercepted for refresh.
pub const AUTH_PREFIX: &str = "auth/";

/// HTTP method of an [`OutboundRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single call to the backend.
///
/// The `retried` marker starts false and can only be set by the crate when
/// the request is handed to the refresh coordinator, which happens at most
/// once per request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    id: Uuid,
    method: Method,
    path: String,
    body: Option<Value>,
    auth_subsystem: bool,
    retried: bool,
}

impl OutboundRequest {
    /// Create a request for `path`, relative to the client's base URL.
    ///
    /// Paths under [`AUTH_PREFIX`] are marked as authentication-subsystem
    /// calls.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into().trim_start_matches('/').to_string();
        let auth_subsystem = path.starts_with(AUTH_PREFIX);
        Self {
            id: Uuid::new_v4(),
            method,
            path,
            body: None,
            auth_subsystem,
            retried: false,
        }
    }

    /// GET `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// POST `path`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// PUT `path`.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// PATCH `path`.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    /// DELETE `path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body.
    pub fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Override the authentication-subsystem marker.
    pub fn with_auth_subsystem(mut self, auth_subsystem: bool) -> Self {
        self.auth_subsystem = auth_subsystem;
        self
    }

    /// Correlation id used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Path relative to the base URL, without a leading slash.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Whether this request targets login, logout, refresh or register.
    pub fn is_auth_subsystem(&self) -> bool {
        self.auth_subsystem
    }

    /// Whether this request has already been through a refresh cycle.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Mark the request for replay after a refresh.
    pub(crate) fn into_replay(mut self) -> Self {
        debug_assert!(!self.retried, "request {} replayed twice", self.id);
        self.retried = true;
        self
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: u16,
    body: Vec<u8>,
}

/// The backend's `{ status, message, data }` wrapper.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Build a response from a JSON value.
    pub fn from_json(status: u16, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, lossily decoded.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserialize the whole body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Unwrap the envelope and deserialize `data`, which must be present.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T> {
        self.data_opt()?
            .ok_or_else(|| Error::Rejected("response carried no data".to_string()))
    }

    /// Unwrap the envelope; `data` may be absent or null.
    pub fn data_opt<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let envelope: Envelope<T> = self.json()?;
        if let Some(status) = &envelope.status
            && !is_success_status(status)
        {
            return Err(Error::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| format!("status {}", status)),
            ));
        }
        Ok(envelope.data)
    }
}

/// `"success"` or a numeric 2xx code.
fn is_success_status(status: &Value) -> bool {
    match status {
        Value::String(s) => s.eq_ignore_ascii_case("success") || s.eq_ignore_ascii_case("ok"),
        Value::Number(n) => n.as_u64().is_some_and(|code| (200..300).contains(&code)),
        _ => false,
    }
}
