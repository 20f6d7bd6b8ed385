//! Process-wide connection registry.
//!
//! The only shared mutable state in the bridge: a lock-guarded map from
//! connection id to the live session for that id. Session handles hold
//! sockets and are inherently process-local, so this stays an in-memory
//! arena rather than external storage. Critical sections are pure map
//! operations; nothing awaits while holding the lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::session::TransportSession;

/// A registered live session.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// The live session handle.
    pub session: Arc<TransportSession>,
    /// When the entry was registered.
    pub created_at: DateTime<Utc>,
}

/// Mapping of connection id → live transport session.
///
/// Invariant: at most one live session per connection id. `register`
/// returns any displaced session so the caller can close it; an entry is
/// never silently dropped.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<String, RegistryEntry>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the session for a connection id.
    ///
    /// Returns the displaced session if one was live; the caller must
    /// close it before discarding (close-before-discard ordering).
    pub fn register(
        &self,
        connection_id: &str,
        session: Arc<TransportSession>,
    ) -> Option<Arc<TransportSession>> {
        let entry = RegistryEntry {
            session,
            created_at: Utc::now(),
        };
        self.lock()
            .insert(connection_id.to_owned(), entry)
            .map(|old| old.session)
    }

    /// Look up the live session for a connection id.
    pub fn lookup(&self, connection_id: &str) -> Option<Arc<TransportSession>> {
        self.lock()
            .get(connection_id)
            .map(|entry| Arc::clone(&entry.session))
    }

    /// Remove and return the session for a connection id, for the caller
    /// to close.
    pub fn remove(&self, connection_id: &str) -> Option<Arc<TransportSession>> {
        self.lock().remove(connection_id).map(|entry| entry.session)
    }

    /// Remove the entry only if it still belongs to the given session
    /// generation.
    ///
    /// Used by implicit teardown when a stream ends: if a reconnect has
    /// already superseded this session, the newer entry stays untouched.
    pub fn remove_if(
        &self,
        connection_id: &str,
        session_id: Uuid,
    ) -> Option<Arc<TransportSession>> {
        let mut entries = self.lock();
        if entries
            .get(connection_id)
            .is_some_and(|entry| entry.session.session_id() == session_id)
        {
            return entries.remove(connection_id).map(|entry| entry.session);
        }
        None
    }

    /// Number of live sessions.
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, RegistryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use crate::transport::ShellControl;

    use super::*;

    struct NoopControl;

    #[async_trait]
    impl ShellControl for NoopControl {
        async fn shutdown(&self) {}
    }

    fn make_session() -> Arc<TransportSession> {
        let (tx, _rx) = mpsc::unbounded_channel();
        Arc::new(TransportSession::new(tx, Box::new(NoopControl)))
    }

    #[test]
    fn register_then_lookup_then_remove() {
        let registry = ConnectionRegistry::new();
        let session = make_session();
        let id = session.session_id();

        assert!(registry.register("cred-1", session).is_none());
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.lookup("cred-1").unwrap().session_id(), id);

        let removed = registry.remove("cred-1").unwrap();
        assert_eq!(removed.session_id(), id);
        assert!(registry.lookup("cred-1").is_none());
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn remove_unknown_id_is_none() {
        let registry = ConnectionRegistry::new();
        assert!(registry.remove("cred-404").is_none());
    }

    #[test]
    fn register_returns_displaced_session() {
        let registry = ConnectionRegistry::new();
        let first = make_session();
        let first_id = first.session_id();
        let second = make_session();

        assert!(registry.register("cred-1", first).is_none());
        let displaced = registry.register("cred-1", Arc::clone(&second)).unwrap();
        assert_eq!(displaced.session_id(), first_id);

        // Exactly one live entry, and it is the newer session.
        assert_eq!(registry.active_count(), 1);
        assert_eq!(
            registry.lookup("cred-1").unwrap().session_id(),
            second.session_id()
        );
    }

    #[test]
    fn remove_if_ignores_stale_generation() {
        let registry = ConnectionRegistry::new();
        let old = make_session();
        let old_id = old.session_id();
        let new = make_session();

        registry.register("cred-1", old);
        registry.register("cred-1", Arc::clone(&new));

        // The old generation's teardown must not evict the new session.
        assert!(registry.remove_if("cred-1", old_id).is_none());
        assert_eq!(registry.active_count(), 1);

        // The current generation removes normally.
        assert!(registry.remove_if("cred-1", new.session_id()).is_some());
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn independent_ids_do_not_interfere() {
        let registry = ConnectionRegistry::new();
        registry.register("cred-1", make_session());
        registry.register("cred-2", make_session());

        registry.remove("cred-1");
        assert!(registry.lookup("cred-1").is_none());
        assert!(registry.lookup("cred-2").is_some());
    }
}
