//! Response handling and transformation.
//!
//! # Responsibilities
//! - Capture a completed destination response as a `ResponseSnapshot`
//! - Write the production snapshot back to the client verbatim
//! - Strip hop-by-hop headers on both directions
//! - Map dispatch failures to HTTP status codes
//!
//! # Design Decisions
//! - Destination responses are buffered (the staging path needs the
//!   production headers and the exchange needs both bodies)
//! - `Content-Length` is kept as-is; the buffered body matches it

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;

use crate::destination::DispatchError;
use crate::session::cookies::{issued_cookies, response_cookies, Cookie};

/// Headers that apply to a single transport hop and are never forwarded.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

/// Immutable capture of a destination response.
#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ResponseSnapshot {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Cookies this response sets, in header order.
    pub fn set_cookies(&self) -> Vec<Cookie> {
        response_cookies(&self.headers)
    }

    /// Cookies declared through `Set-Cookie`, minus the ones being expired.
    pub fn issued_cookies(&self) -> Vec<Cookie> {
        issued_cookies(&self.headers)
    }

    /// Build the client-facing response.
    pub fn to_response(&self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        strip_hop_by_hop(response.headers_mut());
        response
    }
}

impl IntoResponse for ResponseSnapshot {
    fn into_response(self) -> axum::response::Response {
        self.to_response()
    }
}

/// Status returned to the client when the production leg fails.
pub fn dispatch_error_status(error: &DispatchError) -> StatusCode {
    match error {
        DispatchError::DestinationUnreachable(_) => StatusCode::BAD_GATEWAY,
        DispatchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        DispatchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
    }
}

fn dispatch_error_body(error: &DispatchError) -> &'static str {
    match error {
        DispatchError::DestinationUnreachable(_) => "Upstream request failed",
        DispatchError::Timeout(_) => "Upstream request timed out",
        DispatchError::InvalidRequest(_) => "Invalid request",
    }
}

/// The response a client sees for a failed production leg.
impl From<&DispatchError> for ResponseSnapshot {
    fn from(error: &DispatchError) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        ResponseSnapshot::new(dispatch_error_status(error), headers, dispatch_error_body(error))
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> axum::response::Response {
        ResponseSnapshot::from(&self).to_response()
    }
}
