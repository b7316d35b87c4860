//! In-document search for docshelf.
//!
//! This crate provides:
//! - Literal keyword matching with case and whole-word modes
//! - Match indexing over a rendered, paginated [`TextLayer`]
//! - A cursor with wraparound navigation and current-match styling
//! - A debounced search session that cleans up after itself

pub mod debounce;
pub mod error;
pub mod highlight;
pub mod index;
pub mod keyword;
pub mod layer;
pub mod memory;
pub mod navigator;
pub mod session;

pub use error::LayerError;
pub use highlight::{HighlightId, HighlightRegistry};
pub use index::{SearchMatch, build_index};
pub use keyword::NormalizedKeyword;
pub use layer::{LeafId, Rect, SpanRef, TextLayer, TextLeaf};
pub use memory::{LayoutMetrics, MemoryTextLayer, SpanLocation};
pub use navigator::SearchNavigator;
pub use session::{SearchConfig, SearchSession, SearchState};
