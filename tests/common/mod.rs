//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use shadow_proxy::config::ShadowConfig;
use shadow_proxy::destination::SingleDestinationProvider;
use shadow_proxy::exchange::{ChannelSink, Exchange};
use shadow_proxy::session::CookieNameIdentifier;
use shadow_proxy::shadow::{ShadowDispatcher, StagingPool};
use shadow_proxy::store::MemoryCookieStore;
use shadow_proxy::{HttpServer, Shutdown};

/// What a mock backend saw for one request.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub uri: String,
    pub cookie: Option<String>,
    pub request_id: Option<String>,
    pub body: String,
}

/// An axum backend with a canned answer that records every request.
pub struct MockBackend {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn seen(&self) -> Vec<Recorded> {
        self.seen.lock().unwrap().clone()
    }
}

/// Start a backend answering 200 with `body` and one `Set-Cookie` per entry.
pub async fn start_backend(body: &'static str, set_cookies: Vec<&'static str>) -> MockBackend {
    start_backend_with_delay(body, set_cookies, Duration::ZERO).await
}

/// Like `start_backend`, but waits `delay` before answering.
pub async fn start_backend_with_delay(
    body: &'static str,
    set_cookies: Vec<&'static str>,
    delay: Duration,
) -> MockBackend {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();

    let handler = move |request: Request<Body>| {
        let recorder = recorder.clone();
        let set_cookies = set_cookies.clone();
        async move {
            let (parts, body_stream) = request.into_parts();
            let bytes = axum::body::to_bytes(body_stream, usize::MAX).await.unwrap();
            let header_str = |name: &str| {
                parts
                    .headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned)
            };
            recorder.lock().unwrap().push(Recorded {
                method: parts.method.to_string(),
                uri: parts.uri.to_string(),
                cookie: header_str("cookie"),
                request_id: header_str("x-request-id"),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let mut response = Response::builder()
                .status(StatusCode::OK)
                .header("x-backend", body);
            for cookie in set_cookies {
                response = response.header(header::SET_COOKIE, cookie);
            }
            response.body(Body::from(body)).unwrap()
        }
    };

    let app = Router::new()
        .route("/", any(handler.clone()))
        .route("/{*path}", any(handler));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { addr, seen }
}

/// An address nothing is listening on.
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// A running proxy wired to an in-memory store and a channel sink.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub dispatcher: Arc<ShadowDispatcher>,
    pub exchanges: mpsc::Receiver<Exchange>,
    pub shutdown: Shutdown,
    handle: JoinHandle<()>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait for the next published exchange.
    pub async fn next_exchange(&mut self) -> Exchange {
        tokio::time::timeout(Duration::from_secs(5), self.exchanges.recv())
            .await
            .expect("no exchange published in time")
            .expect("exchange channel closed")
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = self.handle.await;
    }
}

/// Start the proxy in front of `production` and `staging`.
pub async fn start_proxy(production: &str, staging: &str, store: MemoryCookieStore) -> TestProxy {
    let mut config = ShadowConfig::default();
    config.production.url = production.to_string();
    config.staging.url = staging.to_string();
    config.production.connect_timeout_secs = 1;
    config.staging.connect_timeout_secs = 1;
    config.security.max_body_size = 1024;

    let shutdown = Shutdown::new();
    let (sink, exchanges) = ChannelSink::new(16);
    let pool = StagingPool::new(16, Duration::from_secs(5), Duration::from_secs(1));
    let dispatcher = Arc::new(ShadowDispatcher::new(
        Arc::new(SingleDestinationProvider::from_config(&config).unwrap()),
        Arc::new(CookieNameIdentifier::new(config.session.cookie_name.clone())),
        Arc::new(store),
        Arc::new(sink),
        pool,
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config, dispatcher.clone());
    let run_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move {
        server.run(listener, run_shutdown).await.unwrap();
    });

    TestProxy {
        addr,
        dispatcher,
        exchanges,
        shutdown,
        handle,
    }
}

/// HTTP client that ignores proxy environment variables.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

