//! Cache bookkeeping records.
//!
//! `CacheMetadata` is the single persisted record describing what the blob
//! store holds. It is loaded at the start of every cache operation and saved
//! at the end; nothing keeps it resident in between.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::keys::{self, KeyKind};

/// One cached document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: String,
    pub size_bytes: u64,
    pub last_accessed_at: DateTime<Utc>,
    /// Logical touch clock; LRU order is ascending `access_seq`.
    pub access_seq: u64,
    pub has_derived_form: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Aggregate cache state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub total_size: u64,
    pub entries: BTreeMap<String, CacheEntry>,
    #[serde(default)]
    pub next_seq: u64,
}

/// Outcome of reconciling metadata against the keys actually stored.
#[derive(Debug, Default, PartialEq)]
pub struct Reconciliation {
    /// Entries dropped because their raw blob is gone.
    pub dropped: Vec<String>,
    /// Stored keys no entry accounts for.
    pub orphans: Vec<String>,
    /// Entries whose derived flag was corrected.
    pub corrected: Vec<String>,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.orphans.is_empty() && self.corrected.is_empty()
    }
}

impl CacheMetadata {
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, id: &str) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Record a new entry, replacing any previous one with the same id.
    pub fn insert(&mut self, id: &str, size_bytes: u64, checksum: Option<String>, now: DateTime<Utc>) {
        self.remove(id);
        let access_seq = self.bump_seq();
        self.entries.insert(
            id.to_string(),
            CacheEntry {
                id: id.to_string(),
                size_bytes,
                last_accessed_at: now,
                access_seq,
                has_derived_form: false,
                checksum,
            },
        );
        self.total_size += size_bytes;
    }

    /// Remove an entry and subtract its size.
    pub fn remove(&mut self, id: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(id)?;
        self.total_size = self.total_size.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    /// Mark an entry as most recently used. Returns false if absent.
    pub fn touch(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        if !self.entries.contains_key(id) {
            return false;
        }
        let seq = self.bump_seq();
        if let Some(entry) = self.entries.get_mut(id) {
            entry.access_seq = seq;
            entry.last_accessed_at = entry.last_accessed_at.max(now);
        }
        true
    }

    pub fn set_derived(&mut self, id: &str, present: bool) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.has_derived_form = present;
        }
    }

    /// Entry ids from least to most recently used.
    pub fn lru_order(&self) -> Vec<&CacheEntry> {
        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.access_seq);
        entries
    }

    /// Sum of entry sizes, independent of the stored aggregate.
    pub fn computed_size(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }

    pub fn recompute_total(&mut self) {
        self.total_size = self.computed_size();
    }

    /// Bring the metadata in line with the keys present in the blob store.
    ///
    /// The store is authoritative: entries without a raw blob are dropped,
    /// derived flags follow presence of the derived key, and keys with no
    /// owning entry are reported as orphans for the caller to delete.
    pub fn reconcile<S: AsRef<str>>(&mut self, stored_keys: &[S]) -> Reconciliation {
        let mut raw = HashSet::new();
        let mut derived = HashSet::new();
        for key in stored_keys {
            match keys::parse_key(key.as_ref()) {
                Some(KeyKind::Raw(id)) => {
                    raw.insert(id.to_string());
                }
                Some(KeyKind::Derived(id)) => {
                    derived.insert(id.to_string());
                }
                None => {}
            }
        }

        let mut report = Reconciliation::default();

        let missing: Vec<String> = self.entries.keys().filter(|id| !raw.contains(*id)).cloned().collect();
        for id in missing {
            self.entries.remove(&id);
            report.dropped.push(id);
        }

        for (id, entry) in self.entries.iter_mut() {
            let present = derived.contains(id);
            if entry.has_derived_form != present {
                entry.has_derived_form = present;
                report.corrected.push(id.clone());
            }
        }

        for key in stored_keys {
            let key = key.as_ref();
            if let Some(kind) = keys::parse_key(key)
                && !self.entries.contains_key(kind.id())
            {
                report.orphans.push(key.to_string());
            }
        }

        self.recompute_total();
        self.next_seq = self
            .next_seq
            .max(self.entries.values().map(|e| e.access_seq).max().unwrap_or(0));
        report
    }
}
