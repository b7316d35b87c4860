//! The object cache.
//!
//! `CacheStore` is the public face of the cache: `put`, `get`, `clear` and
//! `stats`. It keeps no metadata resident. Every operation loads the record
//! from the [`MetadataStore`], works on its own copy, and saves it back when
//! done. Two overlapping operations on the same id can therefore interleave
//! at a storage await; that race is accepted for a single-user client cache.
//!
//! Storage failures never reach `put`/`get` callers. They are retried under
//! the [`RetryPolicy`], then logged, and the call degrades to "not cached".
//! The `try_*` variants expose the underlying `Result` for callers that want
//! to see it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::codec::{ByteCodec, DEFAULT_CHUNK_SIZE};
use super::eviction::EvictionPolicy;
use super::keys;
use super::metadata::CacheMetadata;
use super::retry::RetryPolicy;
use super::store::{BlobStore, MetadataStore};
use crate::Error;

/// Default byte budget (100 MiB).
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 100 * 1024 * 1024;

/// Tunables for a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Byte budget enforced by eviction. Soft: a single oversized object is still stored.
    pub max_cache_size: u64,
    pub retry: RetryPolicy,
    pub codec_chunk_size: usize,
    /// Compare SHA-256 instead of size when deciding a re-put is a no-op.
    pub verify_content: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            retry: RetryPolicy::default(),
            codec_chunk_size: DEFAULT_CHUNK_SIZE,
            verify_content: false,
        }
    }
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_size: u64,
    pub entry_count: usize,
    pub percent_used: f64,
}

/// Size-bounded persistent document cache with a lazy base64 side cache.
pub struct CacheStore {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    config: CacheConfig,
    codec: ByteCodec,
    eviction: EvictionPolicy,
    open: AtomicBool,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Open a cache over the given stores.
    ///
    /// Loads the metadata record once and reconciles it with the keys the
    /// blob store actually holds, so a crash between a blob write and a
    /// metadata save is repaired here. A record that cannot be decoded is
    /// discarded and the cache starts empty.
    pub async fn open(
        config: CacheConfig, blobs: Arc<dyn BlobStore>, metadata: Arc<dyn MetadataStore>,
    ) -> Result<Self, Error> {
        let store = Self {
            codec: ByteCodec::new(config.codec_chunk_size),
            eviction: EvictionPolicy::new(config.max_cache_size),
            config,
            blobs,
            metadata,
            open: AtomicBool::new(true),
        };

        let mut meta = match store.metadata.load().await {
            Ok(meta) => meta.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable cache metadata");
                CacheMetadata::default()
            }
        };

        match store.blobs.list_keys().await {
            Ok(stored) => {
                let report = meta.reconcile(&stored);
                if !report.is_clean() {
                    tracing::info!(
                        dropped = report.dropped.len(),
                        orphans = report.orphans.len(),
                        corrected = report.corrected.len(),
                        "reconciled cache metadata with storage"
                    );
                }
                for key in &report.orphans {
                    store.delete_key(key).await;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not list cached keys, skipping reconciliation");
                meta.recompute_total();
            }
        }

        store.metadata.save(&meta).await?;
        tracing::info!(
            entries = meta.entry_count(),
            total_size = meta.total_size,
            max_size = store.config.max_cache_size,
            "cache opened"
        );
        Ok(store)
    }

    /// Stop serving requests. Later calls behave as misses / no-ops.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            tracing::info!("cache closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn codec(&self) -> ByteCodec {
        self.codec
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.is_open() { Ok(()) } else { Err(Error::Closed) }
    }

    async fn load_metadata(&self) -> Result<CacheMetadata, Error> {
        Ok(self.metadata.load().await?.unwrap_or_default())
    }

    async fn read_key(&self, key: &str) -> Result<Option<Bytes>, Error> {
        self.config.retry.run("get", key, || self.blobs.get(key)).await
    }

    async fn write_key(&self, key: &str, value: &Bytes) -> Result<(), Error> {
        self.config
            .retry
            .run("put", key, || self.blobs.put(key, value.clone()))
            .await
    }

    /// Best-effort delete; failures are logged and left for reconciliation.
    async fn delete_key(&self, key: &str) {
        if let Err(e) = self.config.retry.run("delete", key, || self.blobs.delete(key)).await {
            tracing::warn!(key, error = %e, "failed to delete cached blob");
        }
    }

    /// Cache a document. Never fails; a storage error leaves it uncached.
    pub async fn put(&self, id: &str, bytes: &[u8]) {
        if let Err(e) = self.try_put(id, bytes).await {
            tracing::warn!(id, error = %e, "cache write skipped");
        }
    }

    /// Cache a document, reporting storage failures.
    pub async fn try_put(&self, id: &str, bytes: &[u8]) -> Result<(), Error> {
        self.ensure_open()?;
        if id.is_empty() {
            return Err(Error::InvalidInput("document id must not be empty".into()));
        }
        if keys::is_reserved_id(id) {
            return Err(Error::InvalidInput(format!("document id {id:?} collides with the base64 key namespace")));
        }

        let mut meta = self.load_metadata().await?;
        let now = Utc::now();
        let size = bytes.len() as u64;
        let checksum = self.config.verify_content.then(|| keys::checksum(bytes));

        if let Some(existing) = meta.get(id) {
            let unchanged = match &checksum {
                Some(sum) => existing.checksum.as_ref() == Some(sum),
                None => existing.size_bytes == size,
            };
            if unchanged {
                meta.touch(id, now);
                self.metadata.save(&meta).await?;
                tracing::debug!(id, size, "cache put skipped, entry unchanged");
                return Ok(());
            }
        }

        if let Some(old) = meta.remove(id)
            && old.has_derived_form
        {
            self.delete_key(&keys::derived_key(id)).await;
        }

        self.evict_if_needed(&mut meta, size).await;

        let raw_key = keys::raw_key(id);
        if let Err(e) = self.write_key(&raw_key, &Bytes::copy_from_slice(bytes)).await {
            self.delete_key(&raw_key).await;
            self.metadata.save(&meta).await?;
            return Err(e);
        }

        meta.insert(id, size, checksum, now);
        self.metadata.save(&meta).await?;

        if meta.total_size > self.config.max_cache_size {
            tracing::warn!(
                id,
                size,
                total_size = meta.total_size,
                max_size = self.config.max_cache_size,
                "object exceeds cache budget, stored anyway"
            );
        }
        tracing::debug!(id, size, total_size = meta.total_size, "cached document");
        Ok(())
    }

    /// Remove least-recently-used entries until `required` more bytes fit.
    async fn evict_if_needed(&self, meta: &mut CacheMetadata, required: u64) {
        for id in self.eviction.select_victims(meta, required) {
            self.delete_key(&keys::raw_key(&id)).await;
            self.delete_key(&keys::derived_key(&id)).await;
            if let Some(entry) = meta.remove(&id) {
                tracing::debug!(id = %entry.id, size = entry.size_bytes, "evicted cache entry");
            }
        }
    }

    /// Fetch the base64 form of a cached document, or `None` on a miss.
    pub async fn get(&self, id: &str) -> Option<String> {
        match self.try_get(id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(id, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Fetch the base64 form of a cached document, reporting storage failures.
    pub async fn try_get(&self, id: &str) -> Result<Option<String>, Error> {
        self.ensure_open()?;

        let mut meta = self.load_metadata().await?;
        let Some(entry) = meta.get(id) else {
            tracing::debug!(id, "cache miss");
            return Ok(None);
        };
        let has_derived = entry.has_derived_form;
        meta.touch(id, Utc::now());

        if has_derived {
            let derived_key = keys::derived_key(id);
            match self.read_key(&derived_key).await {
                Ok(Some(value)) => match String::from_utf8(value.to_vec()) {
                    Ok(text) => {
                        if let Err(e) = self.metadata.save(&meta).await {
                            tracing::warn!(id, error = %e, "failed to save cache metadata after derived hit");
                        }
                        tracing::debug!(id, "cache hit (derived)");
                        return Ok(Some(text));
                    }
                    Err(_) => {
                        tracing::warn!(id, "derived form is not valid text, rebuilding");
                        meta.set_derived(id, false);
                    }
                },
                Ok(None) => {
                    tracing::warn!(id, "derived form missing from storage, rebuilding");
                    meta.set_derived(id, false);
                }
                Err(e) => {
                    tracing::warn!(id, error = %e, "derived form unreadable, falling back to raw");
                }
            }
        }

        let raw = match self.read_key(&keys::raw_key(id)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::warn!(id, "raw document missing from storage, dropping entry");
                meta.remove(id);
                self.metadata.save(&meta).await?;
                return Ok(None);
            }
            Err(e) => {
                self.metadata.save(&meta).await?;
                return Err(e);
            }
        };

        let encoded = self.codec.encode(&raw);
        match self
            .write_key(&keys::derived_key(id), &Bytes::from(encoded.clone()))
            .await
        {
            Ok(()) => meta.set_derived(id, true),
            Err(e) => tracing::warn!(id, error = %e, "could not persist derived form"),
        }
        self.metadata.save(&meta).await?;

        tracing::debug!(id, "cache hit (raw)");
        Ok(Some(encoded))
    }

    /// Whether metadata currently records `id`. No blob I/O.
    pub async fn contains(&self, id: &str) -> bool {
        if !self.is_open() {
            return false;
        }
        match self.load_metadata().await {
            Ok(meta) => meta.get(id).is_some(),
            Err(_) => false,
        }
    }

    /// Drop one document. Returns whether an entry existed.
    pub async fn remove(&self, id: &str) -> bool {
        if self.ensure_open().is_err() {
            return false;
        }
        let mut meta = match self.load_metadata().await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(id, error = %e, "cache remove skipped");
                return false;
            }
        };
        let existed = meta.remove(id).is_some();
        self.delete_key(&keys::raw_key(id)).await;
        self.delete_key(&keys::derived_key(id)).await;
        if let Err(e) = self.metadata.save(&meta).await {
            tracing::warn!(id, error = %e, "failed to save cache metadata");
        }
        existed
    }

    /// Delete every cached blob and reset the metadata.
    pub async fn clear(&self) {
        if self.ensure_open().is_err() {
            return;
        }

        let mut doomed: Vec<String> = match self.load_metadata().await {
            Ok(meta) => meta
                .entries
                .keys()
                .flat_map(|id| [keys::raw_key(id), keys::derived_key(id)])
                .collect(),
            Err(_) => Vec::new(),
        };
        match self.config.retry.run("list_keys", "*", || self.blobs.list_keys()).await {
            Ok(stored) => doomed.extend(stored.into_iter().filter(|k| keys::parse_key(k).is_some())),
            Err(e) => tracing::warn!(error = %e, "could not list cached keys, clearing known entries only"),
        }
        doomed.sort();
        doomed.dedup();

        for key in &doomed {
            self.delete_key(key).await;
        }

        if let Err(e) = self.metadata.save(&CacheMetadata::default()).await {
            tracing::warn!(error = %e, "failed to reset cache metadata");
        }
        tracing::info!(keys = doomed.len(), "cache cleared");
    }

    /// Occupancy read straight from the persisted metadata.
    pub async fn stats(&self) -> CacheStats {
        let meta = self.load_metadata().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cache metadata unreadable, reporting empty stats");
            CacheMetadata::default()
        });
        let percent_used = if self.config.max_cache_size == 0 {
            0.0
        } else {
            meta.total_size as f64 / self.config.max_cache_size as f64 * 100.0
        };
        CacheStats { total_size: meta.total_size, entry_count: meta.entry_count(), percent_used }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::{MemoryBlobStore, MemoryMetadataStore};
    use std::time::Duration;

    struct Harness {
        cache: CacheStore,
        blobs: Arc<MemoryBlobStore>,
        meta: Arc<MemoryMetadataStore>,
    }

    impl Harness {
        async fn persisted(&self) -> CacheMetadata {
            self.meta.load().await.unwrap().unwrap_or_default()
        }

        async fn assert_size_invariant(&self) {
            let meta = self.persisted().await;
            assert_eq!(meta.total_size, meta.computed_size());
        }
    }

    fn config(max: u64) -> CacheConfig {
        CacheConfig {
            max_cache_size: max,
            retry: RetryPolicy::new(3, Duration::from_millis(10)),
            ..Default::default()
        }
    }

    async fn harness(config: CacheConfig) -> Harness {
        let blobs = Arc::new(MemoryBlobStore::new());
        let meta = Arc::new(MemoryMetadataStore::new());
        let cache = CacheStore::open(config, blobs.clone(), meta.clone()).await.unwrap();
        Harness { cache, blobs, meta }
    }

    fn payload(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed)).collect()
    }

    #[tokio::test]
    async fn test_budget_scenario_evicts_first_entry() {
        let h = harness(config(100)).await;
        let a = payload(60, 1);
        let b = payload(60, 2);

        h.cache.put("a", &a).await;
        h.cache.put("b", &b).await;

        assert_eq!(h.cache.get("a").await, None);
        assert_eq!(h.cache.get("b").await, Some(h.cache.codec().encode(&b)));
        assert!(!h.blobs.contains("doc-a").await);
        h.assert_size_invariant().await;
    }

    #[tokio::test]
    async fn test_same_size_put_only_refreshes_access() {
        let h = harness(config(100)).await;
        let x = payload(10, 3);

        h.cache.put("x", &x).await;
        let first = h.persisted().await.get("x").cloned().unwrap();
        h.cache.put("x", &x).await;
        let second = h.persisted().await.get("x").cloned().unwrap();

        assert_eq!(h.blobs.counts("doc-x").writes, 1);
        assert!(second.access_seq > first.access_seq);
        assert!(second.last_accessed_at >= first.last_accessed_at);
    }

    #[tokio::test]
    async fn test_lru_evicts_strictly_oldest_first() {
        let h = harness(config(100)).await;
        h.cache.put("a", &payload(30, 1)).await;
        h.cache.put("b", &payload(30, 2)).await;
        h.cache.put("c", &payload(30, 3)).await;

        h.cache.put("d", &payload(20, 4)).await;
        assert!(!h.cache.contains("a").await);
        assert!(h.cache.contains("b").await);

        h.cache.put("e", &payload(60, 5)).await;
        assert!(!h.cache.contains("b").await);
        assert!(!h.cache.contains("c").await);
        assert!(h.cache.contains("d").await);
        assert!(h.cache.contains("e").await);
        h.assert_size_invariant().await;
    }

    #[tokio::test]
    async fn test_get_refreshes_lru_position() {
        let h = harness(config(100)).await;
        h.cache.put("a", &payload(30, 1)).await;
        h.cache.put("b", &payload(30, 2)).await;
        h.cache.put("c", &payload(30, 3)).await;
        assert!(h.cache.get("a").await.is_some());

        h.cache.put("d", &payload(20, 4)).await;
        assert!(h.cache.contains("a").await);
        assert!(!h.cache.contains("b").await);
    }

    #[tokio::test]
    async fn test_second_get_uses_derived_form() {
        let h = harness(config(1000)).await;
        h.cache.put("doc", &payload(50, 9)).await;

        let first = h.cache.get("doc").await.unwrap();
        let second = h.cache.get("doc").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.blobs.counts("doc-doc").reads, 1);
        assert_eq!(h.blobs.counts("doc-b64-doc").reads, 1);
        assert!(h.persisted().await.get("doc").unwrap().has_derived_form);
    }

    #[tokio::test]
    async fn test_get_miss_does_no_io() {
        let h = harness(config(100)).await;
        assert_eq!(h.cache.get("ghost").await, None);
        assert_eq!(h.blobs.counts("doc-ghost"), Default::default());
    }

    #[tokio::test]
    async fn test_missing_derived_falls_back_to_raw() {
        let h = harness(config(1000)).await;
        let data = payload(20, 1);
        h.cache.put("a", &data).await;
        h.cache.get("a").await.unwrap();

        h.blobs.drop_external("doc-b64-a").await;
        let again = h.cache.get("a").await;

        assert_eq!(again, Some(h.cache.codec().encode(&data)));
        assert_eq!(h.blobs.counts("doc-a").reads, 2);
        assert!(h.blobs.contains("doc-b64-a").await);
    }

    #[tokio::test]
    async fn test_missing_raw_purges_entry() {
        let h = harness(config(1000)).await;
        h.cache.put("a", &payload(20, 1)).await;
        h.blobs.drop_external("doc-a").await;

        assert_eq!(h.cache.get("a").await, None);
        let meta = h.persisted().await;
        assert!(meta.get("a").is_none());
        assert_eq!(meta.total_size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_retries_transient_failures() {
        let h = harness(config(1000)).await;
        h.blobs.fail_next_puts(2);

        h.cache.put("a", &payload(5, 1)).await;

        assert!(h.cache.contains("a").await);
        assert_eq!(h.blobs.counts("doc-a").writes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_retries_transient_read_failures() {
        let h = harness(config(1000)).await;
        let data = payload(12, 4);
        h.cache.put("a", &data).await;
        h.blobs.fail_next_gets(2);

        assert_eq!(h.cache.get("a").await, Some(h.cache.codec().encode(&data)));
        assert_eq!(h.blobs.counts("doc-a").reads, 3);
        assert!(h.persisted().await.get("a").unwrap().has_derived_form);
    }

    #[tokio::test(start_paused = true)]
    async fn test_derived_read_retries_transient_failures() {
        let h = harness(config(1000)).await;
        let data = payload(12, 5);
        h.cache.put("a", &data).await;
        let first = h.cache.get("a").await;
        h.blobs.fail_next_gets(2);

        assert_eq!(h.cache.get("a").await, first);
        assert_eq!(h.blobs.counts("doc-b64-a").reads, 3);
        assert_eq!(h.blobs.counts("doc-a").reads, 1);
    }

    #[tokio::test]
    async fn test_derived_hit_survives_metadata_save_failure() {
        let h = harness(config(1000)).await;
        let data = payload(9, 6);
        h.cache.put("a", &data).await;
        let encoded = h.cache.get("a").await;
        assert!(encoded.is_some());
        h.meta.fail_next_saves(1);

        assert_eq!(h.cache.get("a").await, encoded);
        assert!(h.cache.try_get("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ids_in_derived_namespace_are_rejected() {
        let h = harness(config(1000)).await;
        let x = payload(20, 7);

        assert!(matches!(h.cache.try_put("b64-x", b"AAAAAAAAAA").await, Err(Error::InvalidInput(_))));
        h.cache.put("b64-x", b"AAAAAAAAAA").await;
        assert_eq!(h.blobs.total_writes(), 0);
        assert!(!h.cache.contains("b64-x").await);

        h.cache.put("x", &x).await;
        let encoded = h.cache.codec().encode(&x);
        assert_eq!(h.cache.get("x").await, Some(encoded.clone()));
        assert_eq!(h.cache.get("x").await, Some(encoded));
        assert_eq!(h.cache.get("b64-x").await, None);

        // the derived blob of `x` must not be mistaken for a document on reopen
        let reopened = CacheStore::open(config(1000), h.blobs.clone(), h.meta.clone()).await.unwrap();
        assert!(reopened.contains("x").await);
        assert!(!reopened.contains("b64-x").await);
        assert_eq!(reopened.get("x").await, Some(h.cache.codec().encode(&x)));
        assert_eq!(reopened.stats().await.entry_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_gives_up_silently() {
        let h = harness(config(1000)).await;
        h.blobs.fail_next_puts(3);

        h.cache.put("a", &payload(5, 1)).await;

        assert!(!h.cache.contains("a").await);
        assert_eq!(h.blobs.counts("doc-a").writes, 3);
        assert!(matches!(h.cache.try_put("", b"x").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_derived_write_failure_still_returns_value() {
        let h = harness(config(1000)).await;
        let data = payload(8, 2);
        h.cache.put("a", &data).await;
        h.blobs.fail_next_puts(3);

        assert_eq!(h.cache.get("a").await, Some(h.cache.codec().encode(&data)));
        assert!(!h.persisted().await.get("a").unwrap().has_derived_form);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_store_degrades_to_miss() {
        let h = harness(config(1000)).await;
        h.cache.put("a", &payload(8, 2)).await;
        h.blobs.set_unavailable(true);

        assert_eq!(h.cache.get("a").await, None);
        assert!(h.cache.try_get("a").await.is_err());
        assert!(h.cache.contains("a").await);
    }

    #[tokio::test]
    async fn test_oversized_object_is_soft_limit() {
        let h = harness(config(100)).await;
        h.cache.put("small", &payload(40, 1)).await;
        h.cache.put("huge", &payload(150, 2)).await;

        let stats = h.cache.stats().await;
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.total_size, 150);
        assert!(stats.percent_used > 100.0);
        assert!(h.cache.get("huge").await.is_some());
    }

    #[tokio::test]
    async fn test_resize_replaces_entry() {
        let h = harness(config(1000)).await;
        h.cache.put("a", &payload(10, 1)).await;
        h.cache.get("a").await.unwrap();

        let bigger = payload(25, 7);
        h.cache.put("a", &bigger).await;

        let meta = h.persisted().await;
        assert_eq!(meta.total_size, 25);
        assert!(!meta.get("a").unwrap().has_derived_form);
        assert!(!h.blobs.contains("doc-b64-a").await);
        assert_eq!(h.cache.get("a").await, Some(h.cache.codec().encode(&bigger)));
    }

    #[tokio::test]
    async fn test_verify_content_detects_same_size_change() {
        let h = harness(CacheConfig { verify_content: true, ..config(1000) }).await;
        h.cache.put("a", &payload(10, 1)).await;
        h.cache.put("a", &payload(10, 1)).await;
        assert_eq!(h.blobs.counts("doc-a").writes, 1);

        let changed = payload(10, 2);
        h.cache.put("a", &changed).await;
        assert_eq!(h.blobs.counts("doc-a").writes, 2);
        assert_eq!(h.cache.get("a").await, Some(h.cache.codec().encode(&changed)));
    }

    #[tokio::test]
    async fn test_size_invariant_over_sequence() {
        let h = harness(config(120)).await;
        let sizes = [30usize, 50, 10, 70, 5, 90, 45, 1, 0, 33];
        for (i, size) in sizes.iter().enumerate() {
            h.cache.put(&format!("doc{}", i % 4), &payload(*size, i as u8)).await;
            h.assert_size_invariant().await;
            let meta = h.persisted().await;
            assert!(meta.total_size <= 120);
            if i == 6 {
                h.cache.clear().await;
                h.assert_size_invariant().await;
            }
        }
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let h = harness(config(1000)).await;
        h.cache.put("a", &payload(10, 1)).await;
        h.cache.put("b", &payload(10, 2)).await;
        h.cache.get("a").await.unwrap();
        h.blobs.put("doc-orphan", Bytes::from_static(b"zz")).await.unwrap();
        h.blobs.put("unrelated", Bytes::from_static(b"keep")).await.unwrap();

        h.cache.clear().await;

        assert_eq!(h.blobs.len().await, 1);
        assert!(h.blobs.contains("unrelated").await);
        let stats = h.cache.stats().await;
        assert_eq!(stats, CacheStats { total_size: 0, entry_count: 0, percent_used: 0.0 });
    }

    #[tokio::test]
    async fn test_remove_single_entry() {
        let h = harness(config(1000)).await;
        h.cache.put("a", &payload(10, 1)).await;
        h.cache.put("b", &payload(10, 2)).await;

        assert!(h.cache.remove("a").await);
        assert!(!h.cache.remove("a").await);
        assert_eq!(h.cache.stats().await.entry_count, 1);
        assert!(!h.blobs.contains("doc-a").await);
    }

    #[tokio::test]
    async fn test_stats_percent_used() {
        let h = harness(config(200)).await;
        h.cache.put("a", &payload(50, 1)).await;
        let stats = h.cache.stats().await;
        assert_eq!(stats.total_size, 50);
        assert_eq!(stats.entry_count, 1);
        assert!((stats.percent_used - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_closed_cache_is_inert() {
        let h = harness(config(1000)).await;
        h.cache.put("a", &payload(10, 1)).await;
        h.cache.close();

        assert!(!h.cache.is_open());
        assert_eq!(h.cache.get("a").await, None);
        assert!(matches!(h.cache.try_put("b", b"x").await, Err(Error::Closed)));
        h.cache.clear().await;
        assert_eq!(h.cache.stats().await.entry_count, 1);
    }

    #[tokio::test]
    async fn test_open_reconciles_crash_leftovers() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let meta = Arc::new(MemoryMetadataStore::new());

        let mut record = CacheMetadata::default();
        record.insert("kept", 3, None, Utc::now());
        record.insert("lost", 4, None, Utc::now());
        record.total_size = 999;
        meta.save(&record).await.unwrap();
        blobs.put("doc-kept", Bytes::from_static(b"abc")).await.unwrap();
        blobs.put("doc-stray", Bytes::from_static(b"zz")).await.unwrap();

        let cache = CacheStore::open(config(1000), blobs.clone(), meta.clone()).await.unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.total_size, 3);
        assert!(!blobs.contains("doc-stray").await);
        assert!(cache.get("kept").await.is_some());
    }

    #[tokio::test]
    async fn test_open_discards_corrupt_metadata() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let meta = Arc::new(MemoryMetadataStore::new());
        meta.set_raw("{garbage").await;
        blobs.put("doc-a", Bytes::from_static(b"abc")).await.unwrap();

        let cache = CacheStore::open(config(1000), blobs.clone(), meta.clone()).await.unwrap();

        assert_eq!(cache.stats().await.entry_count, 0);
        assert_eq!(blobs.len().await, 0);
    }

    #[tokio::test]
    async fn test_independent_instances() {
        let one = harness(config(100)).await;
        let two = harness(config(100)).await;
        one.cache.put("a", &payload(10, 1)).await;

        assert!(one.cache.contains("a").await);
        assert!(!two.cache.contains("a").await);
    }
}
