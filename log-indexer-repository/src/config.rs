//! Configuration types for the search engine client.

use std::time::Duration;

use url::Url;

use crate::errors::SearchError;

/// Service name used when signing requests for a managed search domain.
pub const DEFAULT_SERVICE_NAME: &str = "es";

/// Connection settings for the indexing endpoint.
#[derive(Debug, Clone)]
pub struct SearchEngineConfig {
    /// Endpoint address, either a bare host or a full URL.
    pub endpoint: String,
    /// Region the signing key is scoped to.
    pub region: String,
    /// Service identity the signature is bound to.
    pub service_name: String,
    /// Per-request timeout. `None` leaves the transport default in place.
    pub request_timeout: Option<Duration>,
}

impl SearchEngineConfig {
    /// Create a config for the given endpoint and region.
    pub fn new(endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            request_timeout: None,
        }
    }

    /// Set a request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Resolve the endpoint to a URL. Bare hosts are reached over HTTPS.
    pub fn endpoint_url(&self) -> Result<Url, SearchError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(SearchError::connection("endpoint is empty"));
        }

        let with_scheme = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("https://{}", endpoint)
        };

        Url::parse(&with_scheme).map_err(|e| SearchError::connection(e.to_string()))
    }
}
