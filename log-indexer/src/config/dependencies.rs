//! Dependency initialization and wiring for the log indexer.

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use chrono::Utc;
use tracing::{info, warn};

use crate::config::Settings;
use crate::IndexingError;
use log_indexer_pipeline::{
    orchestrator::Orchestrator,
    processor::parser_for,
    source::{LocalObjectStore, ObjectStore, S3ObjectStore},
};
use log_indexer_repository::{OpenSearchClient, SearchEngineClient, SearchEngineConfig};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from settings.
    ///
    /// The index date is fixed here, once, from the current UTC date.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If no endpoint is configured or the client cannot be built
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        let endpoint = settings
            .endpoint
            .as_deref()
            .ok_or_else(|| IndexingError::config("ES_ENDPOINT is not set"))?;

        let target = settings.index_target(Utc::now().date_naive());

        info!(
            endpoint = %endpoint,
            region = %settings.region,
            log_type = settings.log_format.as_str(),
            index = %target.index_name,
            doc_type = %target.doc_type,
            "Initializing dependencies"
        );

        let needs_aws = settings.signing || settings.local_storage_root.is_none();
        let sdk_config = if needs_aws {
            Some(load_aws_config(&settings.region).await)
        } else {
            None
        };

        // Initialize OpenSearch client
        let search_config = SearchEngineConfig::new(endpoint, settings.region.clone());
        let search_client = match (&sdk_config, settings.signing) {
            (Some(sdk_config), true) => OpenSearchClient::with_aws_sigv4(&search_config, sdk_config)?,
            _ => OpenSearchClient::new(&search_config)?,
        };

        // Documents are still submitted when the ping fails; those failures surface per object.
        match search_client.health_check().await {
            Ok(true) => info!("OpenSearch connection verified"),
            Ok(false) => warn!("OpenSearch did not answer the health check"),
            Err(e) => warn!(error = %e, "OpenSearch health check failed"),
        }

        // Initialize storage
        let store: Arc<dyn ObjectStore> = match (&settings.local_storage_root, &sdk_config) {
            (Some(root), _) => {
                info!(root = %root.display(), "Reading objects from local storage");
                Arc::new(LocalObjectStore::new(root.clone()))
            }
            (None, Some(sdk_config)) => {
                Arc::new(S3ObjectStore::new(aws_sdk_s3::Client::new(sdk_config)))
            }
            (None, None) => {
                return Err(IndexingError::config("no storage backend available"));
            }
        };

        let orchestrator = Orchestrator::with_config(
            store,
            Arc::new(search_client),
            parser_for(settings.log_format),
            target,
            settings.orchestrator_config(),
        );

        Ok(Self { orchestrator })
    }
}

async fn load_aws_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}
