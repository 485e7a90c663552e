//! HTTP client SDK for the Expensa expense tracker.
//!
//! Every authenticated call goes through [`ExpensaClient::send`]. When the
//! backend answers 401 because the session expired, the client refreshes the
//! session once, however many requests failed at the same time, and replays
//! each of them in the order they failed.
//!
//! # Example
//!
//! ```no_run
//! use expensa_client::{ExpensaClient, LoginRequest, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = ExpensaClient::builder()
//!     .base_url("http://localhost:8080/api/v1")
//!     .on_session_expired(|err| eprintln!("Signed out: {}", err))
//!     .build()?;
//!
//! client
//!     .auth()
//!     .login(&LoginRequest {
//!         email: "ada@example.com".into(),
//!         password: "hunter2".into(),
//!     })
//!     .await?;
//!
//! // A 401 here is refreshed and replayed transparently.
//! let total = client.expenses().total().await?;
//! println!("Spent {:.2}", total);
//! # Ok(())
//! # }
//! ```
//!
//! # Layers
//!
//! - **Transport**: one request, one classified outcome
//! - **Client facade**: intercepts 401s on ordinary requests
//! - **Refresh coordinator**: single-flight refresh plus FIFO replay
//! - **Session store**: the signed-in identity (from `expensa-session`)

pub mod api;
pub mod auth_backend;
pub mod client;
pub mod cookies;
pub mod coordinator;
pub mod error;
pub mod queue;
pub mod request;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use api::{AuthApi, ExpensesApi};
pub use auth_backend::{AuthBackend, HttpAuthBackend, SharedAuthBackend};
pub use client::{ClientBuilder, DEFAULT_BASE_URL, ExpensaClient};
pub use cookies::{SavedCookie, SavedCookies};
pub use coordinator::{RefreshCoordinator, SessionExpiredHook};
pub use error::{Error, Result};
pub use queue::{Outcome, RequestQueue, WaiterHandle};
pub use request::{ApiResponse, Method, OutboundRequest};
pub use transport::{HttpTransport, SharedTransport, Transport};
pub use types::*;

pub use expensa_session::{Session, SessionStore};
