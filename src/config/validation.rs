//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs parse and use supported schemes
//! - Validate value ranges (timeouts > 0, pool size within bounds)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ShadowConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{CookieStoreConfig, DestinationConfig, ExchangeSinkConfig, ShadowConfig};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: invalid URL '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: must not be empty")]
    Empty { field: &'static str },

    #[error("{field}: must be at most {max}")]
    TooLarge { field: &'static str, max: u64 },
}

/// Upper bound on concurrently running staging tasks.
pub const MAX_STAGING_IN_FLIGHT: usize = 1 << 20;

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &ShadowConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    check_destination(&mut errors, "production", &config.production);
    check_destination(&mut errors, "staging", &config.staging);

    if config.session.cookie_name.trim().is_empty() {
        errors.push(ValidationError::Empty {
            field: "session.cookie_name",
        });
    }

    if config.cookie_store.namespace().is_empty() {
        errors.push(ValidationError::Empty {
            field: "cookie_store.namespace",
        });
    }
    if let CookieStoreConfig::Redis { url, .. } = &config.cookie_store {
        check_url(&mut errors, "cookie_store.url", url, &["redis", "rediss", "redis+unix", "unix"]);
    }

    if let ExchangeSinkConfig::Http { url, timeout_secs } = &config.exchange_sink {
        check_url(&mut errors, "exchange_sink.url", url, &["http", "https"]);
        check_positive(&mut errors, "exchange_sink.timeout_secs", *timeout_secs);
    }

    check_positive(
        &mut errors,
        "staging_pool.max_in_flight",
        config.staging_pool.max_in_flight as u64,
    );
    if config.staging_pool.max_in_flight > MAX_STAGING_IN_FLIGHT {
        errors.push(ValidationError::TooLarge {
            field: "staging_pool.max_in_flight",
            max: MAX_STAGING_IN_FLIGHT as u64,
        });
    }
    check_positive(&mut errors, "staging_pool.deadline_secs", config.staging_pool.deadline_secs);
    check_positive(&mut errors, "timeouts.request_secs", config.timeouts.request_secs);
    check_positive(
        &mut errors,
        "security.max_body_size",
        config.security.max_body_size as u64,
    );
    check_positive(
        &mut errors,
        "security.max_response_size",
        config.security.max_response_size as u64,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_destination(errors: &mut Vec<ValidationError>, side: &'static str, dest: &DestinationConfig) {
    let (url_field, connect_field, request_field) = match side {
        "production" => (
            "production.url",
            "production.connect_timeout_secs",
            "production.request_timeout_secs",
        ),
        _ => (
            "staging.url",
            "staging.connect_timeout_secs",
            "staging.request_timeout_secs",
        ),
    };
    check_url(errors, url_field, &dest.url, &["http"]);
    check_positive(errors, connect_field, dest.connect_timeout_secs);
    check_positive(errors, request_field, dest.request_timeout_secs);
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str, schemes: &[&str]) {
    match Url::parse(value) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field });
    }
}
