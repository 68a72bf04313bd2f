//! Single-host HTTP destination.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the destination's base URL
//! - Strip hop-by-hop headers and let the client set `Host`
//! - Forward with a bounded deadline and buffer the response

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::config::DestinationConfig;
use crate::destination::{Destination, DispatchError};
use crate::http::request::RequestSnapshot;
use crate::http::response::{strip_hop_by_hop, ResponseSnapshot};

/// Forwards every request to one fixed base URL.
#[derive(Debug, Clone)]
pub struct HttpDestination {
    name: String,
    base: Url,
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
    max_response_size: usize,
}

impl HttpDestination {
    pub fn new(
        name: impl Into<String>,
        base: Url,
        connect_timeout: Duration,
        request_timeout: Duration,
        max_response_size: usize,
    ) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            name: name.into(),
            base,
            client,
            request_timeout,
            max_response_size,
        }
    }

    /// Build from config; fails when the URL does not parse.
    pub fn from_config(
        name: impl Into<String>,
        config: &DestinationConfig,
        max_response_size: usize,
    ) -> Result<Self, url::ParseError> {
        let base = Url::parse(&config.url)?;
        Ok(Self::new(
            name,
            base,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
            max_response_size,
        ))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Map an inbound URI onto the base URL.
    ///
    /// Paths are joined with exactly one slash; queries from both sides are
    /// kept, base first.
    pub fn target_uri(&self, uri: &Uri) -> Result<Uri, DispatchError> {
        let path = join_paths(self.base.path(), uri.path());
        let query = match (self.base.query().filter(|q| !q.is_empty()), uri.query()) {
            (Some(base), Some(own)) => Some(format!("{}&{}", base, own)),
            (Some(q), None) | (None, Some(q)) => Some(q.to_string()),
            (None, None) => None,
        };
        let path_and_query = match query {
            Some(q) => format!("{}?{}", path, q),
            None => path,
        };
        let authority = &self.base[url::Position::BeforeHost..url::Position::AfterPort];

        Uri::builder()
            .scheme(self.base.scheme())
            .authority(authority)
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| DispatchError::InvalidRequest(e.to_string()))
    }

    async fn exchange(&self, request: Request<Body>) -> Result<ResponseSnapshot, DispatchError> {
        let response = self.client.request(request).await.map_err(|e| {
            DispatchError::DestinationUnreachable(format!("{}: {}", self.name, error_chain(&e)))
        })?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_response_size)
            .await
            .map_err(|e| {
                DispatchError::DestinationUnreachable(format!(
                    "{}: failed reading response body: {}",
                    self.name, e
                ))
            })?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        Ok(ResponseSnapshot::new(parts.status, headers, body))
    }
}

#[async_trait]
impl Destination for HttpDestination {
    fn name(&self) -> &str {
        &self.name
    }

    async fn serve(&self, request: &RequestSnapshot) -> Result<ResponseSnapshot, DispatchError> {
        let uri = self.target_uri(request.uri())?;

        let mut headers = request.headers().clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        let mut builder = Request::builder().method(request.method().clone()).uri(uri);
        if let Some(h) = builder.headers_mut() {
            *h = headers;
        }
        let outbound = builder
            .body(Body::from(request.body().clone()))
            .map_err(|e| DispatchError::InvalidRequest(e.to_string()))?;

        tracing::trace!(
            destination = %self.name,
            method = %request.method(),
            uri = %outbound.uri(),
            "Forwarding request"
        );

        match tokio::time::timeout(self.request_timeout, self.exchange(outbound)).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Timeout(self.request_timeout)),
        }
    }
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use axum::http::HeaderMap;

    fn destination(base: &str) -> HttpDestination {
        HttpDestination::new(
            "test",
            Url::parse(base).unwrap(),
            Duration::from_secs(1),
            Duration::from_secs(1),
            1024,
        )
    }

    #[test]
    fn test_target_uri_rewrites_host() {
        let cases = [
            ("http://example.com/", "/", "http://example.com/"),
            ("http://example.com", "/a/b?x=1", "http://example.com/a/b?x=1"),
            ("http://test.org:8081/base", "/a", "http://test.org:8081/base/a"),
            ("http://test.org:8082/base/", "/a", "http://test.org:8082/base/a"),
            ("http://h/?k=v", "/a?x=1", "http://h/a?k=v&x=1"),
        ];
        for (base, inbound, expected) in cases {
            let uri = destination(base)
                .target_uri(&Uri::from_static(inbound))
                .unwrap();
            assert_eq!(uri.to_string(), expected, "base {} inbound {}", base, inbound);
        }
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", "/x"), "/x");
        assert_eq!(join_paths("/a", "x"), "/a/x");
        assert_eq!(join_paths("/a/", "x"), "/a/x");
        assert_eq!(join_paths("/a", "/x"), "/a/x");
    }

    #[tokio::test]
    async fn test_unreachable_destination() {
        // Port 9 (discard) on localhost is not expected to accept connections.
        let dest = destination("http://127.0.0.1:9");
        let request = RequestSnapshot::new(Method::GET, Uri::from_static("/"), HeaderMap::new(), "");
        let err = dest.serve(&request).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::DestinationUnreachable(_) | DispatchError::Timeout(_)
        ));
    }
}
