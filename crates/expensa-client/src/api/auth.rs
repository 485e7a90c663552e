//! Auth API.

use expensa_session::Session;
use serde_json::Value;
use tracing::{info, warn};

use crate::client::ExpensaClient;
use crate::error::{Error, Result};
use crate::types::{LoginRequest, RegisterRequest, extract_user};

/// Login endpoint.
pub const LOGIN_PATH: &str = "auth/login";

/// Registration endpoint.
pub const REGISTER_PATH: &str = "auth/register";

/// Auth API client.
pub struct AuthApi {
    client: ExpensaClient,
}

impl AuthApi {
    pub(crate) fn new(client: ExpensaClient) -> Self {
        Self { client }
    }

    /// Log in and record the returned user as the current session.
    ///
    /// Wrong credentials come back as [`Error::Unauthorized`]; a login
    /// failure never starts a session refresh.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<Session> {
        let response = self.client.post(LOGIN_PATH, credentials).await?;

        // Surfaces an application-level rejection before looking for the user.
        response.data_opt::<Value>()?;
        let payload: Value = response.json()?;

        let session = extract_user(&payload)
            .ok_or_else(|| Error::Rejected("login response did not include a user".to_string()))?;

        info!(user = %session.email, "Logged in");
        self.client.session().set(session.clone());
        Ok(session)
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, account: &RegisterRequest) -> Result<()> {
        let response = self.client.post(REGISTER_PATH, account).await?;
        response.data_opt::<Value>()?;
        info!(user = %account.email, "Registered account");
        Ok(())
    }

    /// Log out.
    ///
    /// The server-side logout is best effort: its failure is logged and the
    /// local session is cleared regardless.
    pub async fn logout(&self) {
        if let Err(e) = self.client.auth_backend().logout().await {
            warn!(error = %e, "Server-side logout failed, clearing local session anyway");
        }
        self.client.session().clear();
        info!("Logged out");
    }
}
