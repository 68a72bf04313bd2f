//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all proxy handler
//! - Wire up middleware (request ID, tracing, inbound timeout)
//! - Buffer each inbound request and hand it to the shadow dispatcher
//! - Bind server to listener and shut down in order

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ShadowConfig;
use crate::http::request::{MakeRequestUuid, RequestSnapshot, SnapshotError};
use crate::http::response::dispatch_error_status;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::shadow::ShadowDispatcher;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ShadowDispatcher>,
    pub max_body_size: usize,
}

/// HTTP server for the shadowing proxy.
pub struct HttpServer {
    router: Router,
    dispatcher: Arc<ShadowDispatcher>,
}

impl HttpServer {
    /// Create a new HTTP server serving through `dispatcher`.
    pub fn new(config: &ShadowConfig, dispatcher: Arc<ShadowDispatcher>) -> Self {
        let state = AppState {
            dispatcher: dispatcher.clone(),
            max_body_size: config.security.max_body_size,
        };
        let router = Self::build_router(config, state);
        Self { router, dispatcher }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ShadowConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until `shutdown` fires, then drain staging work.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let stop = shutdown.clone();
        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { stop.triggered().await })
            .await;

        // The listener is closed either way; staging work still gets its drain.
        self.dispatcher.shutdown().await;
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Buffers the request, serves it through production, and returns the
/// production response verbatim.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let snapshot = match RequestSnapshot::capture(request, state.max_body_size).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            let status = match e {
                SnapshotError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                SnapshotError::Read(_) => StatusCode::BAD_REQUEST,
            };
            tracing::warn!(method = %method, error = %e, "Rejected inbound request");
            metrics::record_request(&method, status.as_u16(), start);
            return (status, e.to_string()).into_response();
        }
    };

    tracing::debug!(
        request_id = snapshot.request_id().unwrap_or("-"),
        method = %method,
        path = %snapshot.uri().path(),
        "Proxying request"
    );

    match state.dispatcher.dispatch(snapshot).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), start);
            response.into_response()
        }
        Err(e) => {
            metrics::record_request(&method, dispatch_error_status(&e).as_u16(), start);
            e.into_response()
        }
    }
}
