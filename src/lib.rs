//! Traffic-shadowing reverse proxy library.
//!
//! Every inbound request is served by production; a copy is replayed
//! against staging in the background with staging's own session cookies,
//! and the correlated exchange is published for comparison.

pub mod config;
pub mod destination;
pub mod exchange;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod session;
pub mod shadow;
pub mod store;

pub use config::ShadowConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use shadow::ShadowDispatcher;
