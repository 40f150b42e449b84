//! S3 implementation of the object store.

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream as S3Body;
use aws_sdk_s3::Client;
use futures::stream::{self, StreamExt};
use tracing::{debug, instrument};

use crate::errors::PipelineError;
use crate::source::storage::{ByteStream, ObjectStore, StorageError};
use log_indexer_shared::SourceObject;

/// Reads objects from S3, streaming the body without buffering it.
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Create a store from a configured S3 client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Map a `GetObject` service error to a storage error.
    fn classify(error: GetObjectError) -> StorageError {
        if matches!(error, GetObjectError::NoSuchKey(_)) {
            return StorageError::NotFound;
        }

        let message = DisplayErrorContext(&error).to_string();
        match error.code() {
            Some("NoSuchKey") | Some("NotFound") => StorageError::NotFound,
            Some("AccessDenied") | Some("AllAccessDisabled") | Some("InvalidAccessKeyId") => {
                StorageError::AccessDenied(message)
            }
            Some("PermanentRedirect")
            | Some("AuthorizationHeaderMalformed")
            | Some("IllegalLocationConstraintException") => StorageError::WrongRegion(message),
            _ => StorageError::Other(message),
        }
    }

    fn body_stream(body: S3Body) -> ByteStream {
        stream::try_unfold(body, |mut body| async move {
            match body.try_next().await {
                Ok(Some(chunk)) => Ok(Some((chunk.to_vec(), body))),
                Ok(None) => Ok(None),
                Err(e) => Err(PipelineError::read(e.to_string())),
            }
        })
        .boxed()
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self), fields(bucket = %source.bucket, key = %source.key))]
    async fn get_object(&self, source: &SourceObject) -> Result<ByteStream, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&source.bucket)
            .key(&source.key)
            .send()
            .await
            .map_err(|e| Self::classify(e.into_service_error()))?;

        debug!(
            content_length = output.content_length().unwrap_or_default(),
            "Opened object"
        );

        Ok(Self::body_stream(output.body))
    }
}
