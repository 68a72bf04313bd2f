//! Session identity subsystem.
//!
//! # Data Flow
//! ```text
//! Cookie header (request)      Set-Cookie headers (response)
//!     → cookies.rs (parse into ordered Cookie list)
//!     → identifier.rs (SessionIdentifier::resolve)
//!     → SessionId or sessionless
//! ```
//!
//! # Design Decisions
//! - The identifier is an injected strategy, swappable without touching the dispatcher
//! - Missing session id is a normal outcome, never an error

pub mod cookies;
pub mod identifier;

pub use cookies::{Cookie, CookieSet};
pub use identifier::{CookieNameIdentifier, SessionId, SessionIdentifier};
