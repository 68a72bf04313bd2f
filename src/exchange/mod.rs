//! Correlated exchange records.
//!
//! # Data Flow
//! ```text
//! production request/response + staging request/response (snapshots)
//!     → Exchange (owned, serializable record)
//!     → sink.rs (ExchangeSink::publish, fire-and-forget)
//! ```
//!
//! # Design Decisions
//! - Built once per inbound request after both legs complete; never mutated
//! - Ownership moves into the sink
//! - Header maps become name → list-of-values; bodies become UTF-8 (lossy)

pub mod sink;

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::http::request::RequestSnapshot;
use crate::http::response::ResponseSnapshot;

pub use sink::{ChannelSink, ExchangeSink, HttpSink, LogSink, NullSink, PublishError};

/// Header multimap as published.
pub type HeaderRecord = BTreeMap<String, Vec<String>>;

/// One side's request as it was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub method: String,
    pub uri: String,
    pub headers: HeaderRecord,
    pub body: String,
}

/// One side's response as it was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status: u16,
    pub headers: HeaderRecord,
    pub body: String,
}

/// Production and staging request/response for one inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub production_request: RequestRecord,
    pub staging_request: RequestRecord,
    pub production_response: ResponseRecord,
    pub staging_response: ResponseRecord,
}

impl Exchange {
    pub fn new(
        production_request: &RequestSnapshot,
        staging_request: &RequestSnapshot,
        production_response: &ResponseSnapshot,
        staging_response: &ResponseSnapshot,
    ) -> Self {
        Self {
            production_request: production_request.into(),
            staging_request: staging_request.into(),
            production_response: production_response.into(),
            staging_response: staging_response.into(),
        }
    }
}

impl From<&RequestSnapshot> for RequestRecord {
    fn from(snapshot: &RequestSnapshot) -> Self {
        Self {
            method: snapshot.method().to_string(),
            uri: snapshot.uri().to_string(),
            headers: header_record(snapshot.headers()),
            body: String::from_utf8_lossy(snapshot.body()).into_owned(),
        }
    }
}

impl From<&ResponseSnapshot> for ResponseRecord {
    fn from(snapshot: &ResponseSnapshot) -> Self {
        Self {
            status: snapshot.status().as_u16(),
            headers: header_record(snapshot.headers()),
            body: String::from_utf8_lossy(snapshot.body()).into_owned(),
        }
    }
}

fn header_record(headers: &HeaderMap) -> HeaderRecord {
    let mut record = HeaderRecord::new();
    for (name, value) in headers.iter() {
        record
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue, Method, StatusCode, Uri};

    fn request(cookie: &'static str) -> RequestSnapshot {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static(cookie));
        RequestSnapshot::new(Method::POST, Uri::from_static("/cart?item=1"), headers, "qty=2")
    }

    fn response(body: &'static str) -> ResponseSnapshot {
        let mut headers = HeaderMap::new();
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        ResponseSnapshot::new(StatusCode::OK, headers, body)
    }

    #[test]
    fn test_exchange_json_shape() {
        let exchange = Exchange::new(
            &request("id=bob"),
            &request("server=test"),
            &response("Prod"),
            &response("Staging"),
        );
        let json = serde_json::to_value(&exchange).unwrap();

        assert_eq!(json["productionRequest"]["method"], "POST");
        assert_eq!(json["productionRequest"]["uri"], "/cart?item=1");
        assert_eq!(json["productionRequest"]["body"], "qty=2");
        assert_eq!(json["productionRequest"]["headers"]["cookie"][0], "id=bob");
        assert_eq!(json["stagingRequest"]["headers"]["cookie"][0], "server=test");
        assert_eq!(json["productionResponse"]["status"], 200);
        assert_eq!(json["productionResponse"]["body"], "Prod");
        assert_eq!(json["stagingResponse"]["body"], "Staging");
        assert_eq!(
            json["stagingResponse"]["headers"]["set-cookie"],
            serde_json::json!(["a=1", "b=2"])
        );
    }

    #[test]
    fn test_non_utf8_body_is_lossy() {
        let snapshot = ResponseSnapshot::new(StatusCode::OK, HeaderMap::new(), vec![0xff, b'o', b'k']);
        let record = ResponseRecord::from(&snapshot);
        assert!(record.body.ends_with("ok"));
    }
}
