//! The rendered-page capability the search engine drives.
//!
//! A [`TextLayer`] stands in for whatever renders the document: it hands out
//! the text-bearing leaves of a page in document order and can wrap a byte
//! range of one leaf in a highlight span. Span geometry is reported in
//! document coordinates so matches from different pages sort together.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::LayerError;

/// Identifier of a text leaf on a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LeafId(pub u64);

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leaf#{}", self.0)
    }
}

/// Identifier of a highlight span created by [`TextLayer::wrap_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SpanRef(pub u64);

impl fmt::Display for SpanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "span#{}", self.0)
    }
}

/// Bounding box in document coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

/// One text-bearing leaf of a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLeaf {
    pub id: LeafId,
    pub text: String,
    /// The leaf is itself the inside of a highlight span.
    pub in_highlight: bool,
}

/// Read and mark-up access to a rendered, paginated document.
pub trait TextLayer {
    /// Text leaves of `page` (0-based) in document order.
    fn text_leaves(&self, page: usize) -> Result<Vec<TextLeaf>, LayerError>;

    /// Wrap `range` (byte offsets into the leaf text) in a highlight span.
    ///
    /// Text before the range stays in the same leaf, so earlier offsets in
    /// that leaf remain valid after the call.
    fn wrap_range(&mut self, leaf: LeafId, range: Range<usize>) -> Result<SpanRef, LayerError>;

    /// Remove a highlight span, merging its text back into its neighbours.
    fn unwrap_span(&mut self, span: SpanRef) -> Result<(), LayerError>;

    fn span_rect(&self, span: SpanRef) -> Result<Rect, LayerError>;

    /// Toggle the "current match" styling of a span.
    fn set_span_current(&mut self, span: SpanRef, current: bool) -> Result<(), LayerError>;

    /// Scroll so `page` starts `header_offset` below the top of the viewport.
    fn scroll_to_page(&mut self, page: usize, header_offset: f32) -> Result<(), LayerError>;
}

impl<T: TextLayer + ?Sized> TextLayer for &mut T {
    fn text_leaves(&self, page: usize) -> Result<Vec<TextLeaf>, LayerError> {
        (**self).text_leaves(page)
    }

    fn wrap_range(&mut self, leaf: LeafId, range: Range<usize>) -> Result<SpanRef, LayerError> {
        (**self).wrap_range(leaf, range)
    }

    fn unwrap_span(&mut self, span: SpanRef) -> Result<(), LayerError> {
        (**self).unwrap_span(span)
    }

    fn span_rect(&self, span: SpanRef) -> Result<Rect, LayerError> {
        (**self).span_rect(span)
    }

    fn set_span_current(&mut self, span: SpanRef, current: bool) -> Result<(), LayerError> {
        (**self).set_span_current(span, current)
    }

    fn scroll_to_page(&mut self, page: usize, header_offset: f32) -> Result<(), LayerError> {
        (**self).scroll_to_page(page, header_offset)
    }
}
