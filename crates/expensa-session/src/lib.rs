//! Authenticated session store for Expensa clients.
//!
//! This crate holds the identity of the currently signed-in user:
//! - A single [`SessionStore`] owning `Option<Session>`
//! - A derived authenticated flag that is true exactly when a session is present
//! - Persistence hooks so the flag survives a restart
//! - Read-only observers via a `watch` channel
//!
//! # Example
//!
//! ```rust,ignore
//! use expensa_session::{FilePersistence, Session, SessionStore};
//!
//! let store = SessionStore::restore(FilePersistence::new(path));
//! if !store.is_authenticated() {
//!     store.set(Session::new("42", "ada@example.com"));
//! }
//! ```

mod error;
mod persistence;
mod session;
mod store;

pub use error::{Error, Result};
pub use persistence::{FilePersistence, NoPersistence, SessionPersistence, StoredSession};
pub use session::{Session, string_or_number};
pub use store::{SessionSnapshot, SessionStore};
