//! Single-request transport.
//!
//! A [`Transport`] sends exactly one request and classifies the outcome:
//! - 2xx → [`ApiResponse`]
//! - 401 → [`Error::Unauthorized`]
//! - any other status → [`Error::Api`]
//! - no response → [`Error::Network`]
//!
//! It never retries and holds no per-call state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use url::Url;

use crate::error::{Error, ErrorResponse, Result};
use crate::request::{ApiResponse, OutboundRequest};

/// Sends one request and returns a response or a classified failure.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn execute(&self, request: &OutboundRequest) -> Result<ApiResponse>;
}

/// Shared transport handle.
pub type SharedTransport = Arc<dyn Transport>;

/// `reqwest`-backed transport.
///
/// Credentials are HttpOnly cookies, so the underlying client keeps a cookie
/// jar: cookies set by login or refresh apply to every later request made
/// through the same transport, replays included.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport rooted at `base_url`, which must end with `/`,
    /// keeping cookies in `jar`.
    pub fn new(base_url: Url, timeout: Duration, user_agent: &str, jar: Arc<Jar>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .cookie_provider(jar)
            .build()?;

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(Error::from)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &OutboundRequest) -> Result<ApiResponse> {
        let url = self.url(request.path())?;

        let mut builder = self
            .http
            .request(request.method().into(), url)
            .timeout(self.timeout);
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        tracing::trace!(
            request_id = %request.id(),
            method = %request.method(),
            path = %request.path(),
            status,
            "Transport response"
        );

        classify(status, body)
    }
}

/// Map a status and body to the transport outcome.
fn classify(status: u16, body: Vec<u8>) -> Result<ApiResponse> {
    if (200..300).contains(&status) {
        return Ok(ApiResponse::new(status, body));
    }

    let message = match serde_json::from_slice::<ErrorResponse>(&body) {
        Ok(err) => err.message,
        Err(_) => format!("HTTP {}", status),
    };

    if status == 401 {
        Err(Error::Unauthorized(message))
    } else {
        Err(Error::Api { status, message })
    }
}
