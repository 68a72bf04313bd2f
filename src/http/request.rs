//! Request handling and capture.
//!
//! # Responsibilities
//! - Attach a unique request ID (UUID v4) to every inbound request
//! - Buffer the inbound body once into an immutable `RequestSnapshot`
//! - Derive the per-leg copies (production as received, staging with
//!   its cookie header overridden)
//!
//! # Design Decisions
//! - The body stream is consumed exactly once; both legs read from the
//!   same immutable `Bytes` buffer, so neither can starve the other
//! - Snapshots are values: a "modified" snapshot is a new snapshot

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Uri};
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::session::cookies::{request_cookies, Cookie, CookieSet};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a UUID v4 request ID for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Errors while buffering an inbound request.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Body exceeded the configured limit.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The body stream failed mid-read.
    #[error("failed to read request body: {0}")]
    Read(String),
}

/// Immutable capture of an inbound request.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestSnapshot {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            uri,
            headers,
            body: body.into(),
        }
    }

    /// Consume `request`, buffering at most `limit` body bytes.
    pub async fn capture(request: Request<Body>, limit: usize) -> Result<Self, SnapshotError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, limit).await.map_err(|e| {
            if is_length_limit(&e) {
                SnapshotError::BodyTooLarge { limit }
            } else {
                SnapshotError::Read(e.to_string())
            }
        })?;
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Request ID assigned at the edge, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }

    /// Cookies presented by the request, in header order.
    pub fn cookies(&self) -> Vec<Cookie> {
        request_cookies(&self.headers)
    }

    /// A copy whose cookie header is exactly `cookies`.
    ///
    /// Every existing `Cookie` header is removed first; an empty set leaves
    /// the copy without any cookie header.
    pub fn with_cookies(&self, cookies: &CookieSet) -> Self {
        let mut headers = self.headers.clone();
        headers.remove(header::COOKIE);
        if let Some(value) = cookies.to_header_value() {
            headers.insert(header::COOKIE, value);
        }
        Self {
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers,
            body: self.body.clone(),
        }
    }
}

fn is_length_limit(e: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(e);
    while let Some(err) = source {
        if err.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}
