//! Least-recently-used eviction under a byte budget.

use super::metadata::CacheMetadata;

/// Selects LRU victims so that `total + required` fits the budget.
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    max_size: u64,
}

impl EvictionPolicy {
    pub fn new(max_size: u64) -> Self {
        Self { max_size }
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn fits(&self, metadata: &CacheMetadata, required: u64) -> bool {
        metadata.total_size.saturating_add(required) <= self.max_size
    }

    /// Ids to evict, oldest first, stopping as soon as the budget is met.
    ///
    /// When even an empty cache cannot hold `required` bytes every entry is
    /// returned; the caller is then allowed to exceed the budget.
    pub fn select_victims(&self, metadata: &CacheMetadata, required: u64) -> Vec<String> {
        if self.fits(metadata, required) {
            return Vec::new();
        }

        let mut remaining = metadata.total_size;
        let mut victims = Vec::new();
        for entry in metadata.lru_order() {
            if remaining.saturating_add(required) <= self.max_size {
                break;
            }
            remaining = remaining.saturating_sub(entry.size_bytes);
            victims.push(entry.id.clone());
        }
        victims
    }
}
