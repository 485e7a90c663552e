//! CLI command handlers.

use std::time::Duration;

pub mod auth;
pub mod config;
pub mod expense;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Server URL to connect to.
    pub server_url: String,
    /// Name of the client context in use, if any.
    pub context_name: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Bound on a single session refresh.
    pub refresh_timeout: Duration,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}
