//! Persistence hooks for the session store.
//!
//! The store keeps its state in memory and mirrors every change through a
//! [`SessionPersistence`] backend, so that the authenticated flag can be
//! reconstructed before the first request after a restart.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::Session;

/// Default session file name within the expensa config directory.
pub const SESSION_FILE: &str = "session.json";

/// On-disk form of a persisted session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    /// The persisted identity.
    pub user: Session,

    /// When the identity was last written.
    pub saved_at: DateTime<Utc>,
}

/// Trait for session persistence backends.
pub trait SessionPersistence: Send + Sync + std::fmt::Debug {
    /// Load the durable copy, if any.
    fn load(&self) -> Result<Option<Session>>;

    /// Replace the durable copy.
    fn save(&self, session: &Session) -> Result<()>;

    /// Remove the durable copy. Removing a missing copy is not an error.
    fn remove(&self) -> Result<()>;
}

/// A no-op persistence backend for in-memory only sessions.
#[derive(Debug, Clone, Default)]
pub struct NoPersistence;

impl SessionPersistence for NoPersistence {
    fn load(&self) -> Result<Option<Session>> {
        Ok(None)
    }

    fn save(&self, _session: &Session) -> Result<()> {
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        Ok(())
    }
}

/// JSON file persistence.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    /// Persist to an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist to [`SESSION_FILE`] inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SESSION_FILE))
    }

    /// Get the session file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SessionPersistence for FilePersistence {
    fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let stored: StoredSession = serde_json::from_str(&content)?;
        Ok(Some(stored.user))
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let stored = StoredSession {
            user: session.clone(),
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;

        tracing::debug!(path = %self.path.display(), "Session persisted");
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_load_missing_is_none() {
        let temp = tempdir().unwrap();
        let persistence = FilePersistence::in_dir(temp.path());
        assert!(persistence.load().unwrap().is_none());
    }

    #[test]
    fn test_file_save_creates_parent_and_loads() {
        let temp = tempdir().unwrap();
        let persistence = FilePersistence::new(temp.path().join("nested/dir/session.json"));

        let session = Session::new("u-1", "ada@example.com").with_name("Ada");
        persistence.save(&session).unwrap();

        assert_eq!(persistence.load().unwrap(), Some(session));
    }

    #[test]
    fn test_file_remove_is_idempotent() {
        let temp = tempdir().unwrap();
        let persistence = FilePersistence::in_dir(temp.path());

        persistence.save(&Session::new("u-1", "a@b.c")).unwrap();
        persistence.remove().unwrap();
        assert!(!persistence.path().exists());

        persistence.remove().unwrap();
    }

    #[test]
    fn test_file_load_rejects_garbage() {
        let temp = tempdir().unwrap();
        let persistence = FilePersistence::in_dir(temp.path());
        std::fs::write(persistence.path(), "not json").unwrap();

        assert!(matches!(
            persistence.load(),
            Err(Error::Serialization(_))
        ));
    }
}
