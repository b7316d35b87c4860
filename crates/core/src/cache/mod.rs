//! Size-bounded document cache with a lazy base64 side cache.
//!
//! - [`CacheStore`] orchestrates put/get/clear/stats over two injected stores
//! - [`BlobStore`] and [`MetadataStore`] are the persistence seams
//! - [`CacheDb`] backs both seams with one SQLite file (WAL mode, migrations)
//! - the memory stores back them in-process for tests and volatile sessions

pub mod blobs;
pub mod codec;
pub mod connection;
pub mod eviction;
pub mod keys;
pub mod manager;
pub mod memory;
pub mod metadata;
pub mod migrations;
pub mod retry;
pub mod settings;
pub mod store;

pub use crate::Error;

pub use codec::ByteCodec;
pub use connection::CacheDb;
pub use eviction::EvictionPolicy;
pub use manager::{CacheConfig, CacheStats, CacheStore};
pub use memory::{MemoryBlobStore, MemoryMetadataStore};
pub use metadata::{CacheEntry, CacheMetadata};
pub use retry::RetryPolicy;
pub use store::{BlobStore, MetadataStore};
