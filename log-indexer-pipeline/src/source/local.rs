//! Filesystem and in-memory object stores.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::errors::PipelineError;
use crate::source::storage::{ByteStream, ObjectStore, StorageError};
use log_indexer_shared::SourceObject;

/// Size of each read from a local file.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Reads objects from `{root}/{bucket}/{key}` on the local filesystem.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve an object to a file under the root.
    ///
    /// Bucket and key may only contain plain path segments.
    fn path_for(&self, source: &SourceObject) -> Result<PathBuf, StorageError> {
        for part in [&source.bucket, &source.key] {
            let contained = !part.is_empty()
                && Path::new(part)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
            if !contained {
                return Err(StorageError::AccessDenied(format!(
                    "{:?} escapes the storage root",
                    part
                )));
            }
        }
        Ok(self.root.join(&source.bucket).join(&source.key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get_object(&self, source: &SourceObject) -> Result<ByteStream, StorageError> {
        let file = File::open(self.path_for(source)?)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StorageError::NotFound,
                ErrorKind::PermissionDenied => StorageError::AccessDenied(e.to_string()),
                _ => StorageError::Other(e.to_string()),
            })?;

        let chunks = stream::try_unfold(file, |mut file| async move {
            let mut buf = vec![0u8; READ_CHUNK_SIZE];
            let read = file
                .read(&mut buf)
                .await
                .map_err(|e| PipelineError::read(e.to_string()))?;
            if read == 0 {
                return Ok(None);
            }
            buf.truncate(read);
            Ok(Some((buf, file)))
        });

        Ok(chunks.boxed())
    }
}

/// Holds object bodies in memory, serving each in fixed-size chunks.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: HashMap<SourceObject, Vec<u8>>,
    chunk_size: Option<usize>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve bodies in chunks of `chunk_size` bytes instead of one piece.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size.max(1));
        self
    }

    /// Store a body under the given object.
    pub fn insert(&mut self, source: SourceObject, body: impl Into<Vec<u8>>) {
        self.objects.insert(source, body.into());
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, source: &SourceObject) -> Result<ByteStream, StorageError> {
        let body = self.objects.get(source).ok_or(StorageError::NotFound)?;
        let chunk_size = self.chunk_size.unwrap_or(body.len().max(1));

        let chunks: Vec<Result<Vec<u8>, PipelineError>> =
            body.chunks(chunk_size).map(|c| Ok(c.to_vec())).collect();

        Ok(stream::iter(chunks).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_all(stream: ByteStream) -> Vec<u8> {
        stream
            .map(|chunk| chunk.unwrap())
            .concat()
            .await
    }

    #[tokio::test]
    async fn test_memory_store_chunks() {
        let source = SourceObject::new("bucket", "key.gz");
        let mut store = MemoryObjectStore::new().with_chunk_size(3);
        store.insert(source.clone(), b"0123456789".to_vec());

        let chunks: Vec<_> = store.get_object(&source).await.unwrap().collect().await;
        assert_eq!(chunks.len(), 4);

        let body = read_all(store.get_object(&source).await.unwrap()).await;
        assert_eq!(body, b"0123456789");
    }

    #[tokio::test]
    async fn test_memory_store_not_found() {
        let store = MemoryObjectStore::new();
        let result = store.get_object(&SourceObject::new("bucket", "missing")).await;
        assert!(matches!(result, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn test_local_store_reads_file() {
        let root = std::env::temp_dir().join(format!("log-indexer-{}", uuid::Uuid::new_v4()));
        let dir = root.join("bucket").join("prefix");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("file.gz"), b"payload").await.unwrap();

        let store = LocalObjectStore::new(&root);
        let body = read_all(
            store
                .get_object(&SourceObject::new("bucket", "prefix/file.gz"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body, b"payload");

        let missing = store
            .get_object(&SourceObject::new("bucket", "prefix/other.gz"))
            .await;
        assert!(matches!(missing, Err(StorageError::NotFound)));

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_store_keeps_reads_under_root() {
        let root = std::env::temp_dir().join(format!("log-indexer-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(root.join("bucket")).await.unwrap();
        tokio::fs::write(root.join("secret.gz"), b"outside").await.unwrap();

        let store = LocalObjectStore::new(&root);
        for (bucket, key) in [
            ("bucket", "../secret.gz"),
            ("bucket", "prefix/../../secret.gz"),
            ("bucket", "/etc/hostname"),
            ("..", "secret.gz"),
            ("bucket", ""),
        ] {
            let result = store.get_object(&SourceObject::new(bucket, key)).await;
            assert!(
                matches!(result, Err(StorageError::AccessDenied(_))),
                "{}/{} was not rejected",
                bucket,
                key
            );
        }

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
