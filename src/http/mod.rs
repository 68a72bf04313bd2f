//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → request.rs (buffer body once into a RequestSnapshot)
//!     → [shadow dispatcher: production leg, staging replay]
//!     → response.rs (ResponseSnapshot written back verbatim)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestSnapshot, SnapshotError, X_REQUEST_ID};
pub use response::ResponseSnapshot;
pub use server::HttpServer;
