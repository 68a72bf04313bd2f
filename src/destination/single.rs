//! Fixed production/staging destination pair.

use std::sync::Arc;

use crate::config::ShadowConfig;
use crate::destination::{Destination, DestinationProvider, HttpDestination};
use crate::http::request::RequestSnapshot;

/// Returns the same two handlers for every request.
#[derive(Clone)]
pub struct SingleDestinationProvider {
    production: Arc<dyn Destination>,
    staging: Arc<dyn Destination>,
}

impl SingleDestinationProvider {
    pub fn new(production: Arc<dyn Destination>, staging: Arc<dyn Destination>) -> Self {
        Self {
            production,
            staging,
        }
    }

    /// Build HTTP destinations for the configured production and staging URLs.
    pub fn from_config(config: &ShadowConfig) -> Result<Self, url::ParseError> {
        let limit = config.security.max_response_size;
        let production = HttpDestination::from_config("production", &config.production, limit)?;
        let staging = HttpDestination::from_config("staging", &config.staging, limit)?;
        tracing::debug!(
            production = %production.base_url(),
            staging = %staging.base_url(),
            "Destinations configured"
        );
        Ok(Self::new(Arc::new(production), Arc::new(staging)))
    }
}

impl DestinationProvider for SingleDestinationProvider {
    fn production(&self, _request: &RequestSnapshot) -> Arc<dyn Destination> {
        self.production.clone()
    }

    fn staging(&self, _request: &RequestSnapshot) -> Arc<dyn Destination> {
        self.staging.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Method, Uri};

    fn request() -> RequestSnapshot {
        RequestSnapshot::new(Method::POST, Uri::from_static("/"), HeaderMap::new(), "this is a test")
    }

    #[test]
    fn test_from_config_builds_distinct_handlers() {
        let mut config = ShadowConfig::default();
        config.production.url = "http://testing.prod.com".into();
        config.staging.url = "http://testing.prod.com".into();

        let provider = SingleDestinationProvider::from_config(&config).unwrap();
        let r = request();
        assert_eq!(provider.production(&r).name(), "production");
        assert_eq!(provider.staging(&r).name(), "staging");
        assert!(!Arc::ptr_eq(&provider.production(&r), &provider.staging(&r)));
    }

    #[test]
    fn test_same_handler_for_every_request() {
        let provider = SingleDestinationProvider::from_config(&ShadowConfig::default()).unwrap();
        let a = provider.production(&request());
        let b = provider.production(&request());
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let mut config = ShadowConfig::default();
        config.staging.url = "not a url".into();
        assert!(SingleDestinationProvider::from_config(&config).is_err());
    }
}
