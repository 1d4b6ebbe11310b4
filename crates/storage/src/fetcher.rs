//! Retrieval of object bodies by bucket and key.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path;
use object_store::ObjectStore;
use tracing::debug;

use geoingest_core::config::AwsConfig;

use crate::backend::build_s3_store;
use crate::error::StorageError;

/// Reads whole objects from an object store.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Read the full body of `bucket`/`key`.
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError>;

    /// Read the full body and decode it as UTF-8.
    async fn fetch_text(&self, bucket: &str, key: &str) -> Result<String, StorageError> {
        let bytes = self.fetch(bucket, key).await?;
        std::str::from_utf8(&bytes)
            .map(str::to_string)
            .map_err(|source| StorageError::Decode {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            })
    }
}

/// [`ObjectFetcher`] over `object_store`, one store per bucket.
///
/// Notifications may name any bucket, so S3 stores are built on first use and
/// cached. Stores registered with [`with_store`](Self::with_store) take
/// precedence; without AWS config, only registered buckets are reachable.
pub struct ObjectStoreFetcher {
    aws: Option<AwsConfig>,
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl ObjectStoreFetcher {
    pub fn s3(aws: AwsConfig) -> Self {
        Self {
            aws: Some(aws),
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// A fetcher that only knows explicitly registered stores.
    pub fn fixed() -> Self {
        Self {
            aws: None,
            stores: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_store(self, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bucket.into(), store);
        self
    }

    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, StorageError> {
        if let Some(store) = self
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)
        {
            return Ok(store.clone());
        }

        let aws = self
            .aws
            .as_ref()
            .ok_or_else(|| StorageError::NotConfigured(format!("no store for bucket {bucket}")))?;
        let store = build_s3_store(aws, bucket)?;

        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        Ok(stores.entry(bucket.to_string()).or_insert(store).clone())
    }
}

#[async_trait]
impl ObjectFetcher for ObjectStoreFetcher {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let store = self.store_for(bucket)?;
        // `Path::from` would percent-encode reserved characters and name a
        // different object; the key is already the decoded S3 key.
        let location = Path::parse(key).map_err(|source| StorageError::InvalidKey {
            key: key.to_string(),
            source,
        })?;

        let bytes = store.get(&location).await?.bytes().await?;
        debug!(bucket, key, size = bytes.len(), "Fetched object");
        Ok(bytes)
    }
}
