//! Production and staging paths for one inbound request.

use std::sync::Arc;

use crate::destination::{DestinationProvider, DispatchError};
use crate::exchange::{Exchange, ExchangeSink};
use crate::http::request::RequestSnapshot;
use crate::http::response::ResponseSnapshot;
use crate::observability::metrics;
use crate::session::{CookieSet, SessionId, SessionIdentifier};
use crate::shadow::pool::StagingPool;
use crate::store::{CookieStore, StoreError};

/// Serves each request against production and replays it against staging.
///
/// The production result is returned to the caller as soon as it is known;
/// staging work runs afterwards on the [`StagingPool`] and never affects
/// what the caller sees.
pub struct ShadowDispatcher {
    staging: Arc<StagingPath>,
    pool: StagingPool,
}

/// Collaborators shared by every staging task.
struct StagingPath {
    provider: Arc<dyn DestinationProvider>,
    identifier: Arc<dyn SessionIdentifier>,
    store: Arc<dyn CookieStore>,
    sink: Arc<dyn ExchangeSink>,
}

impl ShadowDispatcher {
    pub fn new(
        provider: Arc<dyn DestinationProvider>,
        identifier: Arc<dyn SessionIdentifier>,
        store: Arc<dyn CookieStore>,
        sink: Arc<dyn ExchangeSink>,
        pool: StagingPool,
    ) -> Self {
        Self {
            staging: Arc::new(StagingPath {
                provider,
                identifier,
                store,
                sink,
            }),
            pool,
        }
    }

    /// Serve `request` against production, then launch the staging replay.
    ///
    /// A failed production leg is still replayed; staging sees the error
    /// response the client is about to receive.
    pub async fn dispatch(&self, request: RequestSnapshot) -> Result<ResponseSnapshot, DispatchError> {
        let production = self.staging.provider.production(&request);
        let result = production.serve(&request).await;

        let observed = match &result {
            Ok(response) => response.clone(),
            Err(e) => {
                tracing::warn!(
                    request_id = request.request_id().unwrap_or("-"),
                    destination = production.name(),
                    error = %e,
                    "Production request failed"
                );
                ResponseSnapshot::from(e)
            }
        };

        let request_id = request.request_id().map(str::to_owned);
        let staging = self.staging.clone();
        if !self.pool.spawn(async move { staging.run(request, observed).await }) {
            tracing::debug!(request_id = request_id.as_deref().unwrap_or("-"), "Staging replay skipped");
        }

        result
    }

    /// Wait for every launched staging task to finish.
    pub async fn wait_idle(&self) {
        self.pool.wait_idle().await;
    }

    /// Drain and then cancel outstanding staging work.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

impl StagingPath {
    async fn run(&self, production_request: RequestSnapshot, production_response: ResponseSnapshot) {
        let request_id = production_request.request_id().unwrap_or("-").to_owned();
        let mut session = self.identifier.resolve(&production_request.cookies());

        // Staging sees its own stored cookies, never the client's.
        let staging_request = match &session {
            Some(id) => match self.store.get_all(id).await {
                Ok(cookies) => production_request.with_cookies(&cookies),
                Err(e) => {
                    store_failed("get_all", &e, &request_id, id);
                    production_request.clone()
                }
            },
            None => production_request.clone(),
        };

        let destination = self.provider.staging(&staging_request);
        let staging_response = match destination.serve(&staging_request).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_staging("staging_failed");
                tracing::warn!(
                    request_id = %request_id,
                    destination = destination.name(),
                    error = %e,
                    "Staging request failed"
                );
                return;
            }
        };

        if let Some(new_id) = self.identifier.resolve(&production_response.issued_cookies()) {
            if session.as_ref() != Some(&new_id) {
                if let Some(old_id) = &session {
                    if let Err(e) = self.store.rename(old_id, &new_id).await {
                        store_failed("rename", &e, &request_id, old_id);
                    }
                    metrics::record_session_rotation();
                    tracing::info!(
                        request_id = %request_id,
                        old_session = %old_id,
                        new_session = %new_id,
                        "Session id rotated"
                    );
                }
                session = Some(new_id);
            }
        }

        if let Some(id) = &session {
            let cookies: CookieSet = staging_response.set_cookies().into_iter().collect();
            if let Err(e) = self.store.set_all(id, &cookies).await {
                store_failed("set_all", &e, &request_id, id);
            }
        }

        let exchange = Exchange::new(
            &production_request,
            &staging_request,
            &production_response,
            &staging_response,
        );
        match self.sink.publish(exchange).await {
            Ok(()) => {
                metrics::record_staging("published");
                tracing::debug!(request_id = %request_id, "Exchange published");
            }
            Err(e) => {
                metrics::record_staging("publish_failed");
                tracing::warn!(request_id = %request_id, error = %e, "Failed to publish exchange");
            }
        }
    }
}

fn store_failed(operation: &'static str, error: &StoreError, request_id: &str, session: &SessionId) {
    metrics::record_store_error(operation, error.kind());
    tracing::warn!(
        request_id = %request_id,
        session_id = %session,
        operation,
        error = %error,
        "Cookie store operation failed"
    );
}
