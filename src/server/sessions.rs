use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::{MdmvizError, Result};
use crate::session::Session;

struct StoredSession {
    session: Arc<Session>,
    last_used: DateTime<Utc>,
}

/// Logged-in sessions of the HTTP surface, keyed by an opaque v4 UUID.
///
/// Sessions idle for longer than the TTL are dropped on the next access.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, StoredSession>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn purge_expired(&self, sessions: &mut HashMap<String, StoredSession>, now: DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|_, s| now - s.last_used <= self.ttl);
        let purged = before - sessions.len();
        if purged > 0 {
            log::info!("Expired {} idle session(s)", purged);
        }
    }

    /// Store a session and return its id
    pub fn insert(&self, session: Session) -> String {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut sessions = self.lock();
        self.purge_expired(&mut sessions, now);
        sessions.insert(
            id.clone(),
            StoredSession {
                session: Arc::new(session),
                last_used: now,
            },
        );
        log::info!("Session created ({} active)", sessions.len());
        id
    }

    /// Fetch a live session and mark it used
    pub fn get(&self, id: &str) -> Result<Arc<Session>> {
        self.get_at(id, Utc::now())
    }

    fn get_at(&self, id: &str, now: DateTime<Utc>) -> Result<Arc<Session>> {
        let mut sessions = self.lock();
        self.purge_expired(&mut sessions, now);
        let stored = sessions
            .get_mut(id)
            .ok_or_else(|| MdmvizError::SessionNotFound(id.to_string()))?;
        stored.last_used = now;
        Ok(Arc::clone(&stored.session))
    }

    /// Drop a session; false if it did not exist
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            log::info!("Session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataDocument;
    use crate::session::SessionOptions;

    fn session() -> Session {
        Session::from_metadata(MetadataDocument::default(), SessionOptions::default())
    }

    #[test]
    fn test_insert_get_remove() {
        let store = SessionStore::new(Duration::minutes(5));
        let id = store.insert(session());
        assert_eq!(id.len(), 36);
        assert!(store.get(&id).is_ok());
        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert!(matches!(store.get(&id), Err(MdmvizError::SessionNotFound(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_idle_session_expires() {
        let store = SessionStore::new(Duration::minutes(5));
        let id = store.insert(session());
        let later = Utc::now() + Duration::minutes(6);
        assert!(store.get_at(&id, later).is_err());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_access_refreshes_idle_timer() {
        let store = SessionStore::new(Duration::minutes(5));
        let id = store.insert(session());
        let now = Utc::now();
        assert!(store.get_at(&id, now + Duration::minutes(4)).is_ok());
        assert!(store.get_at(&id, now + Duration::minutes(8)).is_ok());
    }
}
