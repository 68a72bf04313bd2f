//! Traffic shadowing core.
//!
//! # Data Flow
//! ```text
//! RequestSnapshot
//!     → dispatcher.rs (production leg, awaited by the caller)
//!         → ResponseSnapshot to the client
//!     → pool.rs (bounded background task)
//!         → resolve session id → load staging cookies → staging leg
//!         → reconcile id rotation → persist staging cookies
//!         → Exchange → ExchangeSink
//! ```
//!
//! # Design Decisions
//! - The caller never waits on, or observes, the staging leg
//! - Every staging-side failure is logged and counted, never retried
//! - The only state shared between requests is the cookie store

pub mod dispatcher;
pub mod pool;

pub use dispatcher::ShadowDispatcher;
pub use pool::StagingPool;
