//! Destination subsystem.
//!
//! # Data Flow
//! ```text
//! RequestSnapshot
//!     → DestinationProvider::production / ::staging (pick a handler)
//!     → Destination::serve (http.rs: rewrite URI, forward, buffer response)
//!     → ResponseSnapshot or DispatchError
//! ```
//!
//! # Design Decisions
//! - Forwarding mechanics live behind the `Destination` trait; the
//!   dispatcher never sees a connection or a URL
//! - Each destination carries its own deadline
//! - `single.rs` returns two fixed handlers regardless of request content

pub mod http;
pub mod single;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::http::request::RequestSnapshot;
use crate::http::response::ResponseSnapshot;

pub use self::http::HttpDestination;
pub use self::single::SingleDestinationProvider;

/// Errors from serving a request against a destination.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Connection failed or the exchange broke mid-flight.
    #[error("destination unreachable: {0}")]
    DestinationUnreachable(String),

    /// The destination did not answer within its deadline.
    #[error("destination timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be expressed against the destination.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// A handler able to serve one HTTP exchange.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn serve(&self, request: &RequestSnapshot) -> Result<ResponseSnapshot, DispatchError>;
}

/// Picks the production and staging handlers for a request.
pub trait DestinationProvider: Send + Sync {
    fn production(&self, request: &RequestSnapshot) -> Arc<dyn Destination>;
    fn staging(&self, request: &RequestSnapshot) -> Arc<dyn Destination>;
}
