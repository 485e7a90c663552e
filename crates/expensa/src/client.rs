//! Connection to the Expensa backend for one CLI invocation.
//!
//! Each command runs in its own process, so the session identity and the
//! credential cookies are restored from the config directory on open and
//! written back by [`Connection::save`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use console::Style;
use expensa_client::{ExpensaClient, SavedCookies};
use expensa_session::{FilePersistence, Session, SessionStore};
use reqwest::cookie::Jar;
use tracing::{debug, warn};

use crate::commands::Context;

/// A client wired to the on-disk session and cookies.
pub struct Connection {
    client: ExpensaClient,
    cookie_file: Option<PathBuf>,
}

impl Connection {
    /// Build a client for `ctx`, restoring any saved session.
    pub fn open(ctx: &Context) -> Result<Self> {
        let store = match expensa_config::session_file_path() {
            Some(path) => SessionStore::restore(FilePersistence::new(path)),
            None => SessionStore::new(),
        };

        let jar = Arc::new(Jar::default());
        let cookie_file = expensa_config::cookie_file_path();
        if let Some(path) = &cookie_file
            && let Some(saved) = load_cookies(path)
        {
            saved.restore_into(&jar);
        }

        let client = ExpensaClient::builder()
            .base_url(ctx.server_url.clone())
            .timeout(ctx.timeout)
            .refresh_timeout(ctx.refresh_timeout)
            .session_store(Arc::new(store))
            .cookie_jar(jar)
            .on_session_expired(|_| {
                let yellow = Style::new().yellow();
                eprintln!(
                    "{} Your session has expired. Run `expensa auth login` to sign in again.",
                    yellow.apply_to("!")
                );
            })
            .build()
            .with_context(|| format!("Invalid server URL: {}", ctx.server_url))?;

        Ok(Self {
            client,
            cookie_file,
        })
    }

    pub fn client(&self) -> &ExpensaClient {
        &self.client
    }

    /// The signed-in user, or an error telling the user to log in.
    pub fn require_session(&self) -> Result<Session> {
        self.client
            .session()
            .current()
            .ok_or_else(|| anyhow::anyhow!("Not logged in. Run `expensa auth login` first."))
    }

    /// Persist the credential cookies while signed in; drop them otherwise.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.cookie_file else {
            return Ok(());
        };

        let saved = self.client.saved_cookies();
        if self.client.is_authenticated() && !saved.is_empty() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let json = serde_json::to_string_pretty(&saved)?;
            write_private(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!(path = %path.display(), cookies = saved.cookies.len(), "Saved cookies");
        } else {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "Removed saved cookies"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to remove {}", path.display()));
                }
            }
        }

        Ok(())
    }
}

/// Write a credential file readable by the owner only (0600 on Unix).
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::fs::{OpenOptions, Permissions};
        use std::io::Write;
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        // `mode` only applies on create; tighten a file left by an older run.
        file.set_permissions(Permissions::from_mode(0o600))?;
        file.write_all(contents.as_bytes())
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, contents)
    }
}

/// Read saved cookies, ignoring a missing or unreadable file.
fn load_cookies(path: &Path) -> Option<SavedCookies> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read saved cookies");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(saved) => Some(saved),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring corrupt cookie file");
            None
        }
    }
}
