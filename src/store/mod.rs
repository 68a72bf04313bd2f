//! Staging-side cookie store.
//!
//! # Data Flow
//! ```text
//! Staging task
//!     → CookieStore::get_all(session)      (load staging cookies before replay)
//!     → CookieStore::rename(old, new)      (production rotated the session id)
//!     → CookieStore::set_all(session, ..) (persist what staging set)
//!
//! Backings:
//!     memory.rs  (in-process, tests and single-node setups)
//!     redis.rs   (one Redis hash per session)
//! ```
//!
//! # Design Decisions
//! - Every key is `<namespace>.<session id>` (see `CacheKey`)
//! - Per-key atomicity is the store's job; the dispatcher holds no lock
//! - All store failures are non-fatal to the dispatcher

pub mod memory;
pub mod redis;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::session::{CookieSet, SessionId};

pub use self::memory::MemoryCookieStore;
pub use self::redis::RedisCookieStore;

/// Errors returned by a cookie store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("cookie store unreachable: {0}")]
    Connection(String),

    /// A single-field lookup missed.
    #[error("cookie {name} not found for {key}")]
    NotFound { key: String, name: String },

    /// A stored value could not be decoded.
    #[error("malformed stored value: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Connection(_) => "connection",
            StoreError::NotFound { .. } => "not_found",
            StoreError::Serialization(_) => "serialization",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The address of one session's cookie set: `<namespace>.<session id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(namespace: &str, id: &SessionId) -> Self {
        Self(format!("{}.{}", namespace, id.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session-keyed store of staging cookies.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Upsert a single cookie.
    async fn set_one(&self, id: &SessionId, name: &str, value: &str) -> StoreResult<()>;

    /// Upsert every cookie in `cookies`. An empty set is a successful no-op.
    async fn set_all(&self, id: &SessionId, cookies: &CookieSet) -> StoreResult<()>;

    /// Fetch one cookie value; `StoreError::NotFound` when absent.
    async fn get_one(&self, id: &SessionId, name: &str) -> StoreResult<String>;

    /// Fetch the whole set; an unknown id yields an empty set.
    async fn get_all(&self, id: &SessionId) -> StoreResult<CookieSet>;

    /// Atomically move the whole set from `old` to `new`, replacing anything
    /// stored under `new`. Renaming an id with no entry is a no-op.
    async fn rename(&self, old: &SessionId, new: &SessionId) -> StoreResult<()>;
}
