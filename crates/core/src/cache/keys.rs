//! Storage key namespacing and payload checksums.
//!
//! Raw documents live under `doc-<id>`, their base64 form under
//! `doc-b64-<id>`. The derived prefix is checked first because it shares
//! the raw prefix.

use sha2::{Digest, Sha256};

const RAW_PREFIX: &str = "doc-";
const DERIVED_PREFIX: &str = "doc-b64-";

/// Which namespace a storage key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind<'a> {
    Raw(&'a str),
    Derived(&'a str),
}

impl<'a> KeyKind<'a> {
    /// The document id the key refers to.
    pub fn id(&self) -> &'a str {
        match self {
            KeyKind::Raw(id) | KeyKind::Derived(id) => id,
        }
    }
}

/// Key holding the raw binary for a document.
pub fn raw_key(id: &str) -> String {
    format!("{RAW_PREFIX}{id}")
}

/// Key holding the base64 form of a document.
pub fn derived_key(id: &str) -> String {
    format!("{DERIVED_PREFIX}{id}")
}

/// Whether the raw key for `id` would land in the derived namespace.
///
/// `doc-b64-x` is both the raw key of `b64-x` and the derived key of `x`,
/// so such ids cannot be stored.
pub fn is_reserved_id(id: &str) -> bool {
    raw_key(id).starts_with(DERIVED_PREFIX)
}

/// Classify a storage key, returning `None` for keys this cache does not own.
pub fn parse_key(key: &str) -> Option<KeyKind<'_>> {
    if let Some(id) = key.strip_prefix(DERIVED_PREFIX) {
        return Some(KeyKind::Derived(id));
    }
    key.strip_prefix(RAW_PREFIX).map(KeyKind::Raw)
}

/// Hex SHA-256 of a payload, used for content verification on re-put.
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
