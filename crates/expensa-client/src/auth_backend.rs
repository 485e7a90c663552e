//! The authentication backend used by the refresh coordinator.

use std::sync::Arc;

use async_trait::async_trait;
use expensa_session::Session;
use serde_json::Value;

use crate::error::Result;
use crate::request::OutboundRequest;
use crate::transport::SharedTransport;
use crate::types::extract_user;

/// Session refresh endpoint.
pub const REFRESH_PATH: &str = "auth/refresh";

/// Server-side logout endpoint.
pub const LOGOUT_PATH: &str = "auth/logout";

/// Server-side session operations.
#[async_trait]
pub trait AuthBackend: Send + Sync + std::fmt::Debug {
    /// Re-authenticate using the refresh credential.
    ///
    /// Returns the updated identity when the backend reports one.
    async fn refresh(&self) -> Result<Option<Session>>;

    /// Invalidate the session server-side.
    async fn logout(&self) -> Result<()>;
}

/// Shared auth backend handle.
pub type SharedAuthBackend = Arc<dyn AuthBackend>;

/// Auth backend that talks to the Expensa server.
///
/// Calls go straight to the [`Transport`](crate::Transport), never through
/// the client facade, so a 401 from the refresh endpoint cannot start
/// another refresh.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    transport: SharedTransport,
}

impl HttpAuthBackend {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn refresh(&self) -> Result<Option<Session>> {
        // No body: the refresh token travels in an HttpOnly cookie.
        let response = self
            .transport
            .execute(&OutboundRequest::post(REFRESH_PATH))
            .await?;

        match response.json::<Value>() {
            Ok(payload) => Ok(extract_user(&payload)),
            Err(e) => {
                tracing::debug!(error = %e, "Refresh response had no JSON body");
                Ok(None)
            }
        }
    }

    async fn logout(&self) -> Result<()> {
        self.transport
            .execute(&OutboundRequest::post(LOGOUT_PATH))
            .await?;
        Ok(())
    }
}
