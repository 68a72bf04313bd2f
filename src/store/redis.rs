//! Redis-backed cookie store.
//!
//! Each session is one Redis hash stored under `<namespace>.<session id>`,
//! with one field per cookie name. Rotation uses `RENAME`, which Redis
//! executes atomically.

use std::collections::HashMap;

use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, ErrorKind, RedisError};
use async_trait::async_trait;

use crate::session::{CookieSet, SessionId};
use crate::store::{CacheKey, CookieStore, StoreError, StoreResult};

/// Cookie store over a shared, auto-reconnecting Redis connection.
#[derive(Clone)]
pub struct RedisCookieStore {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisCookieStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str, namespace: impl Into<String>) -> StoreResult<Self> {
        let client = ::redis::Client::open(url).map_err(map_error)?;
        let conn = client.get_connection_manager().await.map_err(map_error)?;
        let namespace = namespace.into();
        tracing::info!(url = %url, namespace = %namespace, "Redis cookie store connected");
        Ok(Self { conn, namespace })
    }

    fn key(&self, id: &SessionId) -> CacheKey {
        CacheKey::new(&self.namespace, id)
    }
}

#[async_trait]
impl CookieStore for RedisCookieStore {
    async fn set_one(&self, id: &SessionId, name: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(self.key(id).as_str(), name, value)
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn set_all(&self, id: &SessionId, cookies: &CookieSet) -> StoreResult<()> {
        if cookies.is_empty() {
            return Ok(());
        }
        let fields: Vec<(&str, &str)> = cookies.iter().collect();
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset_multiple(self.key(id).as_str(), &fields[..])
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn get_one(&self, id: &SessionId, name: &str) -> StoreResult<String> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.hget(key.as_str(), name).await.map_err(map_error)?;
        value.ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
            name: name.to_string(),
        })
    }

    async fn get_all(&self, id: &SessionId) -> StoreResult<CookieSet> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> =
            conn.hgetall(self.key(id).as_str()).await.map_err(map_error)?;
        Ok(fields.into_iter().collect())
    }

    async fn rename(&self, old: &SessionId, new: &SessionId) -> StoreResult<()> {
        let old_key = self.key(old);
        let new_key = self.key(new);
        if old_key == new_key {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let result: Result<(), RedisError> =
            conn.rename(old_key.as_str(), new_key.as_str()).await;
        match result {
            Ok(()) => Ok(()),
            Err(e) if is_no_such_key(&e) => {
                tracing::debug!(old = %old_key, new = %new_key, "Nothing stored under old session id");
                Ok(())
            }
            Err(e) => Err(map_error(e)),
        }
    }
}

fn is_no_such_key(e: &RedisError) -> bool {
    e.kind() == ErrorKind::ResponseError && e.detail().is_some_and(|d| d.contains("no such key"))
}

fn map_error(e: RedisError) -> StoreError {
    match e.kind() {
        ErrorKind::TypeError => StoreError::Serialization(e.to_string()),
        // WRONGTYPE: the key holds something other than a hash.
        _ if e.code() == Some("WRONGTYPE") => StoreError::Serialization(e.to_string()),
        _ => StoreError::Connection(e.to_string()),
    }
}
