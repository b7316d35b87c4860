//! Text layer error types.

use crate::layer::{LeafId, SpanRef};

/// Errors reported by a [`TextLayer`](crate::TextLayer) or the highlight registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayerError {
    /// No text leaf with this id exists on the layer.
    #[error("unknown text leaf: {0}")]
    UnknownLeaf(LeafId),

    /// No highlight span with this id exists on the layer.
    #[error("unknown highlight span: {0}")]
    UnknownSpan(SpanRef),

    /// The byte range is empty, out of bounds, not on a char boundary, or
    /// targets a leaf that is already highlighted.
    #[error("invalid range {start}..{end} in leaf {leaf}")]
    InvalidRange { leaf: LeafId, start: usize, end: usize },

    /// Page index past the end of the document.
    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    /// A highlight handle from an earlier index generation.
    #[error("stale highlight handle")]
    StaleHighlight,

    /// The rendering layer refused the operation.
    #[error("render error: {0}")]
    Render(String),
}
