//! In-process cookie store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::session::{CookieSet, SessionId};
use crate::store::{CacheKey, CookieStore, StoreError, StoreResult};

/// A thread-safe, namespaced map of session id -> cookie set.
///
/// A single lock guards the whole map so a rename is atomic with respect to
/// every reader and writer of both keys.
#[derive(Clone)]
pub struct MemoryCookieStore {
    inner: Arc<RwLock<HashMap<CacheKey, CookieSet>>>,
    namespace: String,
}

impl MemoryCookieStore {
    /// Create a new empty store.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            namespace: namespace.into(),
        }
    }

    /// Number of sessions with stored cookies.
    pub fn count(&self) -> usize {
        self.inner.read().expect("cookie store lock poisoned").len()
    }

    fn key(&self, id: &SessionId) -> CacheKey {
        CacheKey::new(&self.namespace, id)
    }
}

#[async_trait]
impl CookieStore for MemoryCookieStore {
    async fn set_one(&self, id: &SessionId, name: &str, value: &str) -> StoreResult<()> {
        let key = self.key(id);
        let mut map = self.inner.write().expect("cookie store lock poisoned");
        map.entry(key).or_default().insert(name, value);
        Ok(())
    }

    async fn set_all(&self, id: &SessionId, cookies: &CookieSet) -> StoreResult<()> {
        if cookies.is_empty() {
            return Ok(());
        }
        let key = self.key(id);
        let mut map = self.inner.write().expect("cookie store lock poisoned");
        map.entry(key).or_default().merge(cookies.clone());
        Ok(())
    }

    async fn get_one(&self, id: &SessionId, name: &str) -> StoreResult<String> {
        let key = self.key(id);
        let map = self.inner.read().expect("cookie store lock poisoned");
        map.get(&key)
            .and_then(|set| set.get(name))
            .map(str::to_string)
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
                name: name.to_string(),
            })
    }

    async fn get_all(&self, id: &SessionId) -> StoreResult<CookieSet> {
        let key = self.key(id);
        let map = self.inner.read().expect("cookie store lock poisoned");
        Ok(map.get(&key).cloned().unwrap_or_default())
    }

    async fn rename(&self, old: &SessionId, new: &SessionId) -> StoreResult<()> {
        let old_key = self.key(old);
        let new_key = self.key(new);
        if old_key == new_key {
            return Ok(());
        }
        let mut map = self.inner.write().expect("cookie store lock poisoned");
        if let Some(set) = map.remove(&old_key) {
            map.insert(new_key, set);
        }
        Ok(())
    }
}
