//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the cookie store, exchange sink, destinations, and session
//!   identifier named by the configuration
//! - Assemble them into a `ShadowDispatcher`
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, including an unreachable
//!   durable store (at runtime the same failure is only logged)
//! - Components are built in order, not concurrently

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{CookieStoreConfig, ExchangeSinkConfig, ShadowConfig};
use crate::destination::SingleDestinationProvider;
use crate::exchange::{ExchangeSink, HttpSink, LogSink, NullSink, PublishError};
use crate::session::CookieNameIdentifier;
use crate::shadow::{ShadowDispatcher, StagingPool};
use crate::store::{CookieStore, MemoryCookieStore, RedisCookieStore, StoreError};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid destination URL: {0}")]
    DestinationUrl(#[from] url::ParseError),

    #[error("cookie store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("exchange sink setup failed: {0}")]
    Sink(#[from] PublishError),
}

/// Build the configured cookie store.
pub async fn build_store(config: &CookieStoreConfig) -> Result<Arc<dyn CookieStore>, StartupError> {
    let store: Arc<dyn CookieStore> = match config {
        CookieStoreConfig::Memory { namespace } => {
            tracing::info!(namespace = %namespace, "Using in-memory cookie store");
            Arc::new(MemoryCookieStore::new(namespace.clone()))
        }
        CookieStoreConfig::Redis { url, namespace } => {
            Arc::new(RedisCookieStore::connect(url, namespace.clone()).await?)
        }
    };
    Ok(store)
}

/// Build the configured exchange sink.
pub fn build_sink(config: &ExchangeSinkConfig) -> Result<Arc<dyn ExchangeSink>, StartupError> {
    let sink: Arc<dyn ExchangeSink> = match config {
        ExchangeSinkConfig::Log => Arc::new(LogSink),
        ExchangeSinkConfig::Http { url, timeout_secs } => {
            tracing::info!(url = %url, "Publishing exchanges over HTTP");
            Arc::new(HttpSink::new(url.clone(), Duration::from_secs(*timeout_secs))?)
        }
        ExchangeSinkConfig::None => Arc::new(NullSink),
    };
    Ok(sink)
}

/// Wire every component named by `config` into a dispatcher.
pub async fn build_dispatcher(config: &ShadowConfig) -> Result<ShadowDispatcher, StartupError> {
    let store = build_store(&config.cookie_store).await?;
    let sink = build_sink(&config.exchange_sink)?;
    let provider = SingleDestinationProvider::from_config(config)?;
    let identifier = CookieNameIdentifier::new(config.session.cookie_name.clone());
    let pool = StagingPool::from_config(&config.staging_pool);

    tracing::info!(
        production = %config.production.url,
        staging = %config.staging.url,
        session_cookie = identifier.cookie_name(),
        max_in_flight = config.staging_pool.max_in_flight,
        "Shadow dispatcher ready"
    );

    Ok(ShadowDispatcher::new(
        Arc::new(provider),
        Arc::new(identifier),
        store,
        sink,
        pool,
    ))
}
