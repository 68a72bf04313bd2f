//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the shadowing proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Production backend; its responses are what clients see.
    pub production: DestinationConfig,

    /// Staging backend; receives a replay of every request.
    pub staging: DestinationConfig,

    /// How the session id is read from cookies.
    pub session: SessionConfig,

    /// Where staging-side cookies are kept between requests.
    pub cookie_store: CookieStoreConfig,

    /// Where completed exchanges are published.
    pub exchange_sink: ExchangeSinkConfig,

    /// Bounds on background staging work.
    pub staging_pool: StagingPoolConfig,

    /// Inbound request timeouts.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            production: DestinationConfig::default(),
            staging: DestinationConfig::staging_default(),
            session: SessionConfig::default(),
            cookie_store: CookieStoreConfig::default(),
            exchange_sink: ExchangeSinkConfig::default(),
            staging_pool: StagingPoolConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A single upstream destination.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// Base URL (e.g., "http://127.0.0.1:3000").
    pub url: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Total time for one request/response exchange in seconds.
    pub request_timeout_secs: u64,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

impl DestinationConfig {
    /// Defaults for the staging side (next port over).
    pub fn staging_default() -> Self {
        Self {
            url: "http://127.0.0.1:3001".to_string(),
            ..Self::default()
        }
    }
}

/// Session identification settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session id.
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "id".to_string(),
        }
    }
}

/// Cookie store backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum CookieStoreConfig {
    /// In-process map; state is lost on restart.
    Memory {
        #[serde(default = "default_namespace")]
        namespace: String,
    },
    /// Redis hash per session.
    Redis {
        /// Connection URL (e.g., "redis://127.0.0.1:6379/0").
        url: String,
        #[serde(default = "default_namespace")]
        namespace: String,
    },
}

impl Default for CookieStoreConfig {
    fn default() -> Self {
        CookieStoreConfig::Memory {
            namespace: default_namespace(),
        }
    }
}

impl CookieStoreConfig {
    pub fn namespace(&self) -> &str {
        match self {
            CookieStoreConfig::Memory { namespace } => namespace,
            CookieStoreConfig::Redis { namespace, .. } => namespace,
        }
    }
}

fn default_namespace() -> String {
    "shadow".to_string()
}

/// Exchange sink selection.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExchangeSinkConfig {
    /// JSON documents on the log stream.
    #[default]
    Log,
    /// POST JSON documents to a collector.
    Http {
        url: String,
        #[serde(default = "default_sink_timeout")]
        timeout_secs: u64,
    },
    /// Discard exchanges.
    None,
}

fn default_sink_timeout() -> u64 {
    5
}

/// Staging task pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StagingPoolConfig {
    /// Maximum concurrent staging tasks; extra work is shed.
    pub max_in_flight: usize,

    /// Deadline for one staging task in seconds.
    pub deadline_secs: u64,

    /// Grace period for in-flight staging tasks at shutdown in seconds.
    pub drain_secs: u64,
}

impl Default for StagingPoolConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 256,
            deadline_secs: 30,
            drain_secs: 5,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for the production leg) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound request body size in bytes.
    pub max_body_size: usize,
    /// Maximum destination response body size in bytes.
    pub max_response_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            max_response_size: 64 * 1024 * 1024, // 64MB
        }
    }
}
