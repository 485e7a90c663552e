//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use expensa_session::SessionStore;
use reqwest::cookie::Jar;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::api::{AuthApi, ExpensesApi};
use crate::auth_backend::{HttpAuthBackend, SharedAuthBackend};
use crate::cookies::SavedCookies;
use crate::coordinator::{RefreshCoordinator, SessionExpiredHook};
use crate::error::{Error, Result};
use crate::request::{ApiResponse, OutboundRequest};
use crate::transport::{HttpTransport, SharedTransport};

/// Default server for [`ExpensaClient::localhost`].
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on a single session refresh.
const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Expensa API client.
///
/// Requests that fail because the session expired are refreshed and replayed
/// transparently; see [`ExpensaClient::send`].
///
/// # Example
///
/// ```no_run
/// use expensa_client::ExpensaClient;
///
/// # async fn example() -> expensa_client::Result<()> {
/// let client = ExpensaClient::builder()
///     .base_url("http://localhost:8080/api/v1")
///     .build()?;
///
/// let expenses = client.expenses().list().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ExpensaClient {
    inner: Arc<ClientInner>,
}

/// State shared across clones.
struct ClientInner {
    transport: SharedTransport,
    auth: SharedAuthBackend,
    session: Arc<SessionStore>,
    coordinator: Arc<RefreshCoordinator>,
    cookies: Arc<Jar>,
    base_url: Url,
}

impl std::fmt::Debug for ExpensaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpensaClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("authenticated", &self.inner.session.is_authenticated())
            .field("coordinator", &self.inner.coordinator)
            .finish_non_exhaustive()
    }
}

impl ExpensaClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client with default settings pointing to localhost.
    pub fn localhost() -> Result<Self> {
        Self::builder().base_url(DEFAULT_BASE_URL).build()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The session store. Read it to decide whether protected operations
    /// may run; the client itself is the only writer.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    /// Whether a session is present.
    pub fn is_authenticated(&self) -> bool {
        self.inner.session.is_authenticated()
    }

    /// The refresh coordinator, for diagnostics.
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.inner.coordinator
    }

    /// Capture the credential cookies for reuse by a later client.
    pub fn saved_cookies(&self) -> SavedCookies {
        SavedCookies::capture(&self.inner.cookies, &self.inner.base_url)
    }

    pub(crate) fn auth_backend(&self) -> &SharedAuthBackend {
        &self.inner.auth
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the auth API.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Access the expenses API.
    pub fn expenses(&self) -> ExpensesApi {
        ExpensesApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request pipeline
    // ─────────────────────────────────────────────────────────────────────────

    /// Send an authenticated request.
    ///
    /// Successes and non-401 failures come back unchanged. A 401 hands the
    /// request to the refresh coordinator and resolves to its replay, unless
    /// the request belongs to the auth subsystem (returned as is) or has
    /// already been replayed once ([`Error::AlreadyRetried`]).
    pub async fn send(&self, request: OutboundRequest) -> Result<ApiResponse> {
        match self.inner.transport.execute(&request).await {
            Err(Error::Unauthorized(message)) => self.recover(request, message).await,
            outcome => outcome,
        }
    }

    async fn recover(&self, request: OutboundRequest, message: String) -> Result<ApiResponse> {
        if request.is_auth_subsystem() {
            debug!(request_id = %request.id(), path = %request.path(), "Auth request rejected");
            return Err(Error::Unauthorized(message));
        }
        if request.is_retried() {
            return Err(Error::AlreadyRetried(message));
        }

        debug!(
            request_id = %request.id(),
            path = %request.path(),
            "Session expired, deferring request"
        );
        self.inner.coordinator.defer(request.into_replay()).await
    }

    /// GET `path` and unwrap the envelope's `data`.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(OutboundRequest::get(path)).await?.data()
    }

    /// POST `body` to `path`.
    pub(crate) async fn post<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        self.send(OutboundRequest::post(path).with_body(body)?).await
    }
}

/// Builder for creating an ExpensaClient.
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    refresh_timeout: Option<Duration>,
    user_agent: Option<String>,
    session_store: Option<Arc<SessionStore>>,
    transport: Option<SharedTransport>,
    auth_backend: Option<SharedAuthBackend>,
    cookie_jar: Option<Arc<Jar>>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("refresh_timeout", &self.refresh_timeout)
            .field("user_agent", &self.user_agent)
            .field("custom_transport", &self.transport.is_some())
            .field("custom_auth_backend", &self.auth_backend.is_some())
            .field("on_session_expired", &self.on_session_expired.is_some())
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            refresh_timeout: Some(DEFAULT_REFRESH_TIMEOUT),
            user_agent: None,
            session_store: None,
            transport: None,
            auth_backend: None,
            cookie_jar: None,
            on_session_expired: None,
        }
    }

    /// Set the base URL for the server, including the API prefix.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bound each session refresh. An elapsed refresh signs the user out.
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    /// Let a session refresh run for as long as the transport allows.
    pub fn without_refresh_timeout(mut self) -> Self {
        self.refresh_timeout = None;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Use an existing session store, e.g. one restored from disk.
    pub fn session_store(mut self, store: Arc<SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Replace the HTTP transport.
    pub fn transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the auth backend. Defaults to one sharing the transport.
    pub fn auth_backend(mut self, auth: SharedAuthBackend) -> Self {
        self.auth_backend = Some(auth);
        self
    }

    /// Keep credential cookies in `jar`, e.g. one restored with
    /// [`SavedCookies::restore_into`].
    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Run `hook` after a failed refresh has signed the user out.
    pub fn on_session_expired<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ExpensaClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let cookies = self.cookie_jar.unwrap_or_default();
        let transport: SharedTransport = match self.transport {
            Some(transport) => transport,
            None => {
                let user_agent = self
                    .user_agent
                    .unwrap_or_else(|| format!("expensa-client/{}", env!("CARGO_PKG_VERSION")));
                Arc::new(HttpTransport::new(
                    base_url.clone(),
                    self.timeout,
                    &user_agent,
                    cookies.clone(),
                )?)
            }
        };

        let auth = self
            .auth_backend
            .unwrap_or_else(|| Arc::new(HttpAuthBackend::new(transport.clone())));
        let session = self.session_store.unwrap_or_default();

        let coordinator = Arc::new(
            RefreshCoordinator::new(transport.clone(), auth.clone(), session.clone())
                .with_refresh_timeout(self.refresh_timeout)
                .with_session_expired_hook(self.on_session_expired),
        );

        Ok(ExpensaClient {
            inner: Arc::new(ClientInner {
                transport,
                auth,
                session,
                coordinator,
                cookies,
                base_url,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
