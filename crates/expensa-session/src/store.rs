//! The session store.

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::persistence::{NoPersistence, SessionPersistence};
use crate::session::Session;

/// Point-in-time view of the store for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current identity, if signed in.
    pub session: Option<Session>,

    /// True exactly when `session` is present.
    pub authenticated: bool,
}

impl From<Option<Session>> for SessionSnapshot {
    fn from(session: Option<Session>) -> Self {
        Self {
            authenticated: session.is_some(),
            session,
        }
    }
}

/// Holder of the current authenticated identity.
///
/// The store is a pure state container:
/// - `set` and `clear` are the only mutations and never fail
/// - every mutation is mirrored to the persistence backend
/// - observers receive updates through [`SessionStore::subscribe`] but
///   cannot write
///
/// The authenticated flag is derived from the presence of a session, so the
/// two can never disagree.
#[derive(Debug)]
pub struct SessionStore {
    state: watch::Sender<Option<Session>>,
    persistence: Box<dyn SessionPersistence>,
}

impl SessionStore {
    /// Create an empty, in-memory store.
    pub fn new() -> Self {
        Self::with_persistence(NoPersistence)
    }

    /// Create an empty store backed by `persistence`.
    ///
    /// The durable copy is not read; use [`SessionStore::restore`] for that.
    pub fn with_persistence(persistence: impl SessionPersistence + 'static) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state,
            persistence: Box::new(persistence),
        }
    }

    /// Create a store and seed it from the durable copy.
    ///
    /// An unreadable copy is treated as signed out.
    pub fn restore(persistence: impl SessionPersistence + 'static) -> Self {
        let store = Self::with_persistence(persistence);
        match store.persistence.load() {
            Ok(Some(session)) => {
                debug!(user_id = %session.id, "Restored persisted session");
                store.state.send_replace(Some(session));
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Ignoring unreadable persisted session"),
        }
        store
    }

    /// Replace the current session and mark the store authenticated.
    ///
    /// The durable copy is written while the watch value is locked, so a
    /// concurrent `clear` cannot interleave between the two.
    pub fn set(&self, session: Session) {
        self.state.send_modify(|current| {
            if let Err(e) = self.persistence.save(&session) {
                warn!(error = %e, "Failed to persist session");
            }
            debug!(user_id = %session.id, "Session set");
            *current = Some(session);
        });
    }

    /// Remove the current session and its durable copy.
    pub fn clear(&self) {
        self.state.send_if_modified(|current| {
            if let Err(e) = self.persistence.remove() {
                warn!(error = %e, "Failed to remove persisted session");
            }
            let was_set = current.take().is_some();
            if was_set {
                debug!("Session cleared");
            }
            was_set
        });
    }

    /// The current session, if signed in.
    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    /// Whether a session is present.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Current session and flag, read together.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.current().into()
    }

    /// Watch for changes. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::FilePersistence;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;

    /// In-memory durable copy whose writes finish late.
    #[derive(Debug, Clone, Default)]
    struct SlowMemory {
        copy: Arc<Mutex<Option<Session>>>,
    }

    impl SlowMemory {
        fn get(&self) -> Option<Session> {
            self.copy.lock().unwrap().clone()
        }
    }

    impl SessionPersistence for SlowMemory {
        fn load(&self) -> crate::Result<Option<Session>> {
            Ok(self.get())
        }

        fn save(&self, session: &Session) -> crate::Result<()> {
            *self.copy.lock().unwrap() = Some(session.clone());
            std::thread::sleep(Duration::from_millis(5));
            Ok(())
        }

        fn remove(&self) -> crate::Result<()> {
            *self.copy.lock().unwrap() = None;
            Ok(())
        }
    }

    fn ada() -> Session {
        Session::new("u-1", "ada@example.com").with_name("Ada")
    }

    #[test]
    fn test_new_store_is_unauthenticated() {
        let store = SessionStore::new();
        assert!(!store.is_authenticated());
        assert!(store.current().is_none());
    }

    #[test]
    fn test_set_and_clear_keep_flag_in_sync() {
        let store = SessionStore::new();

        store.set(ada());
        assert!(store.is_authenticated());
        assert_eq!(store.current(), Some(ada()));

        store.clear();
        assert!(!store.is_authenticated());
        assert_eq!(
            store.snapshot(),
            SessionSnapshot {
                session: None,
                authenticated: false
            }
        );
    }

    #[test]
    fn test_set_replaces_previous_session() {
        let store = SessionStore::new();
        store.set(ada());
        store.set(Session::new("u-2", "grace@example.com"));
        assert_eq!(store.current().unwrap().id, "u-2");
    }

    #[test]
    fn test_file_backed_store_survives_restart() {
        let temp = tempdir().unwrap();

        let store = SessionStore::restore(FilePersistence::in_dir(temp.path()));
        assert!(!store.is_authenticated());
        store.set(ada());
        drop(store);

        let restored = SessionStore::restore(FilePersistence::in_dir(temp.path()));
        assert!(restored.is_authenticated());
        assert_eq!(restored.current(), Some(ada()));

        restored.clear();
        drop(restored);

        let after_clear = SessionStore::restore(FilePersistence::in_dir(temp.path()));
        assert!(!after_clear.is_authenticated());
    }

    #[test]
    fn test_restore_ignores_corrupt_file() {
        let temp = tempdir().unwrap();
        let persistence = FilePersistence::in_dir(temp.path());
        std::fs::write(persistence.path(), "{").unwrap();

        let store = SessionStore::restore(persistence);
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_subscribers_observe_changes() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        assert!(rx.borrow().is_none());

        store.set(ada());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&ada()));

        store.clear();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[test]
    fn test_concurrent_set_and_clear_match_durable_copy() {
        for _ in 0..20 {
            let durable = SlowMemory::default();
            let store = Arc::new(SessionStore::with_persistence(durable.clone()));

            let setter = {
                let store = store.clone();
                std::thread::spawn(move || store.set(ada()))
            };
            let clearer = {
                let store = store.clone();
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(1));
                    store.clear()
                })
            };
            setter.join().unwrap();
            clearer.join().unwrap();

            assert_eq!(store.current(), durable.get());
        }
    }

    #[test]
    fn test_clear_when_signed_out_still_removes_durable_copy() {
        let durable = SlowMemory::default();
        durable.save(&ada()).unwrap();

        let store = SessionStore::with_persistence(durable.clone());
        store.clear();
        assert!(durable.get().is_none());
    }
}
