use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory cache of live sessions keyed by session id.
///
/// Sessions never share state; the cache only maps ids to the per-session
/// handle that owns everything else.
pub struct SessionCache<T> {
    sessions: Arc<RwLock<HashMap<String, T>>>,
}

impl<T: Clone> SessionCache<T> {
    /// Creates a new empty SessionCache.
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Gets a cached session by id.
    ///
    /// # Returns
    ///
    /// `Some(session)` if the session is cached, `None` otherwise.
    pub async fn get(&self, session_id: &str) -> Option<T> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    /// Inserts a session, replacing any previous entry with the same id.
    pub async fn insert(&self, session_id: String, session: T) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, session);
    }

    /// Removes a session from the cache, returning it if present.
    pub async fn remove(&self, session_id: &str) -> Option<T> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Clears all cached sessions.
    pub async fn clear(&self) {
        let mut sessions = self.sessions.write().await;
        sessions.clear();
    }
}

impl<T: Clone> Default for SessionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SessionCache<T> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_get_remove() {
        let cache: SessionCache<Arc<String>> = SessionCache::new();
        cache.insert("s-1".into(), Arc::new("first".into())).await;
        assert_eq!(cache.get("s-1").await.unwrap().as_str(), "first");
        assert!(cache.get("s-2").await.is_none());
        assert_eq!(cache.len().await, 1);

        let shared = cache.clone();
        assert!(shared.remove("s-1").await.is_some());
        assert!(cache.get("s-1").await.is_none());
    }
}
