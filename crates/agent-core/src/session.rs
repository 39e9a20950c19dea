use async_trait::async_trait;
use dashmap::DashMap;

use crate::traits::SessionStore;
use crate::types::Session;

/// Default session store: a concurrent map guarded per-key by `DashMap`'s
/// own sharded locking. Two concurrent turns for the same session are not
/// required to be atomic across a full get/modify/set cycle — last-writer
/// wins, which the specification accepts.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).map(|entry| entry.clone())
    }

    async fn set(&self, session_id: &str, session: Session) {
        self.sessions.insert(session_id.to_string(), session);
    }

    async fn clear(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QueryParameters;

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = InMemorySessionStore::new();
        let mut session = Session::default();
        session.parameters = QueryParameters::default();
        store.set("abc", session.clone()).await;
        let fetched = store.get("abc").await.expect("session present");
        assert_eq!(fetched.parameters, session.parameters);
    }

    #[tokio::test]
    async fn clear_removes_session() {
        let store = InMemorySessionStore::new();
        store.set("abc", Session::default()).await;
        store.clear("abc").await;
        assert!(store.get("abc").await.is_none());
    }
}
