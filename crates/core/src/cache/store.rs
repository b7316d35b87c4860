//! Persistence capabilities consumed by the cache.
//!
//! The cache is written against these two traits only; any durable
//! key-value store can back it.

use async_trait::async_trait;
use bytes::Bytes;

use super::metadata::CacheMetadata;
use crate::Error;

/// Durable keyed byte store holding raw and derived document forms.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, value: Bytes) -> Result<(), Error>;

    async fn get(&self, key: &str) -> Result<Option<Bytes>, Error>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), Error>;

    async fn list_keys(&self) -> Result<Vec<String>, Error>;
}

/// Small-record settings store holding the single metadata record.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn load(&self) -> Result<Option<CacheMetadata>, Error>;

    async fn save(&self, metadata: &CacheMetadata) -> Result<(), Error>;
}
