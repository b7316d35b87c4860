//! Volatile in-process stores.
//!
//! Used as the backend for tests and for sessions that do not need the
//! cache to outlive the process. Both stores count their calls and can be
//! told to fail, which is how the retry and self-healing paths are
//! exercised.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::metadata::CacheMetadata;
use super::store::{BlobStore, MetadataStore};
use crate::Error;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OpCounts {
    pub reads: usize,
    pub writes: usize,
    pub deletes: usize,
}

/// In-memory [`BlobStore`].
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
    counts: Mutex<HashMap<String, OpCounts>>,
    fail_puts: AtomicU32,
    fail_gets: AtomicU32,
    unavailable: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, key: &str, f: impl FnOnce(&mut OpCounts)) {
        if let Ok(mut counts) = self.counts.lock() {
            f(counts.entry(key.to_string()).or_default());
        }
    }

    fn check(&self, budget: &AtomicU32, op: &str, key: &str) -> Result<(), Error> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Storage(format!("{op} {key}: store unavailable")));
        }
        let injected = budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(Error::Storage(format!("{op} {key}: injected failure")));
        }
        Ok(())
    }

    /// Call counts for one key.
    pub fn counts(&self, key: &str) -> OpCounts {
        self.counts
            .lock()
            .map(|c| c.get(key).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Writes across all keys.
    pub fn total_writes(&self) -> usize {
        self.counts
            .lock()
            .map(|c| c.values().map(|o| o.writes).sum())
            .unwrap_or_default()
    }

    /// Make the next `n` puts fail.
    pub fn fail_next_puts(&self, n: u32) {
        self.fail_puts.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` gets fail.
    pub fn fail_next_gets(&self, n: u32) {
        self.fail_gets.store(n, Ordering::SeqCst);
    }

    /// Fail every call until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Drop a key behind the cache's back, as a browser storage purge would.
    pub async fn drop_external(&self, key: &str) {
        self.blobs.write().await.remove(key);
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.blobs.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, value: Bytes) -> Result<(), Error> {
        self.record(key, |c| c.writes += 1);
        self.check(&self.fail_puts, "put", key)?;
        self.blobs.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, Error> {
        self.record(key, |c| c.reads += 1);
        self.check(&self.fail_gets, "get", key)?;
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.record(key, |c| c.deletes += 1);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Storage(format!("delete {key}: store unavailable")));
        }
        self.blobs.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, Error> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Storage("list_keys: store unavailable".into()));
        }
        let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// In-memory [`MetadataStore`] holding the record as serialized JSON.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    record: RwLock<Option<String>>,
    saves: AtomicU32,
    fail_saves: AtomicU32,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored record verbatim (e.g. with a corrupt payload).
    pub async fn set_raw(&self, json: impl Into<String>) {
        *self.record.write().await = Some(json.into());
    }

    pub fn save_count(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make the next `n` saves fail.
    pub fn fail_next_saves(&self, n: u32) {
        self.fail_saves.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn load(&self) -> Result<Option<CacheMetadata>, Error> {
        match self.record.read().await.as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, metadata: &CacheMetadata) -> Result<(), Error> {
        if self
            .fail_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::Storage("save metadata: injected failure".into()));
        }
        let json = serde_json::to_string(metadata)?;
        *self.record.write().await = Some(json);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
