//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client. Requests against a managed domain are
//! signed with AWS SigV4 by the transport at send time.

use async_trait::async_trait;
use aws_types::SdkConfig;
use opensearch::{
    auth::Credentials,
    http::{
        headers::{HeaderMap, HeaderValue, CONTENT_TYPE},
        transport::{SingleNodeConnectionPool, TransportBuilder},
        Method,
    },
    OpenSearch,
};
use tracing::{debug, info, instrument, warn};

use crate::config::SearchEngineConfig;
use crate::errors::SearchError;
use crate::interfaces::{IndexResponse, SearchEngineClient};
use log_indexer_shared::IndexTarget;

const JSON_CONTENT_TYPE: &str = "application/json";

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// let sdk_config = aws_config::load_from_env().await;
/// let config = SearchEngineConfig::new("search-logs.us-east-1.es.amazonaws.com", "us-east-1");
/// let client = OpenSearchClient::with_aws_sigv4(&config, &sdk_config)?;
///
/// let target = IndexTarget::new("alblogs-2024.01.01", "alb-access-logs");
/// client.index_document(&target, r#"{"elb":"app/my-lb"}"#.to_string()).await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create an unsigned client, for clusters reachable without IAM auth.
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint and timeout settings
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If the endpoint is invalid or transport setup fails
    pub fn new(config: &SearchEngineConfig) -> Result<Self, SearchError> {
        let url = config.endpoint_url()?;

        let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url.clone()))
            .disable_proxy();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let transport = builder
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        info!(url = %url, signed = false, "Created OpenSearch client");

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    /// Create a client that signs every request with AWS SigV4.
    ///
    /// Credentials are taken from the provider chain of `sdk_config`; the
    /// signature is bound to `config.region` and `config.service_name`.
    pub fn with_aws_sigv4(
        config: &SearchEngineConfig,
        sdk_config: &SdkConfig,
    ) -> Result<Self, SearchError> {
        let url = config.endpoint_url()?;

        let sdk_config = sdk_config
            .to_builder()
            .region(aws_types::region::Region::new(config.region.clone()))
            .build();
        let credentials: Credentials = sdk_config
            .try_into()
            .map_err(|e: opensearch::Error| SearchError::credentials(e.to_string()))?;

        let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url.clone()))
            .auth(credentials)
            .service_name(&config.service_name);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let transport = builder
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        info!(
            url = %url,
            region = %config.region,
            service = %config.service_name,
            signed = true,
            "Created OpenSearch client"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    #[instrument(skip(self, body), fields(path = %target.path(), bytes = body.len()))]
    async fn index_document(
        &self,
        target: &IndexTarget,
        body: String,
    ) -> Result<IndexResponse, SearchError> {
        let response = self
            .client
            .send(
                Method::Post,
                &target.path(),
                Self::json_headers(),
                None::<&()>,
                Some(body),
                None,
            )
            .await?;

        let status = response.status_code();
        let text = response.text().await.map_err(|e| {
            warn!(status = %status, error = %e, "Failed to read index response body");
            SearchError::transport(format!("failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            warn!(status = %status, body = %text, "Index request rejected");
            return Err(SearchError::index(status.as_u16(), text));
        }

        debug!(status = %status, "Document indexed");
        Ok(IndexResponse::new(status.as_u16(), text))
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self.client.ping().send().await?;
        Ok(response.status_code().is_success())
    }
}
