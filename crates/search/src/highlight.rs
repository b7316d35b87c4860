//! Highlight arena.
//!
//! The registry is the only code that creates or removes highlight spans on
//! a [`TextLayer`]. Matches refer to highlights by [`HighlightId`], which
//! carries the registry generation it was issued in; clearing the registry
//! bumps the generation, so handles from an older index resolve to nothing
//! instead of to a newer highlight that reused the slot.

use std::ops::Range;

use serde::Serialize;

use crate::LayerError;
use crate::layer::{LeafId, Rect, SpanRef, TextLayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HighlightId {
    slot: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy)]
struct Highlight {
    span: SpanRef,
    page: usize,
}

#[derive(Debug, Default)]
pub struct HighlightRegistry {
    slots: Vec<Highlight>,
    generation: u32,
}

impl HighlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Wrap `range` of `leaf` on `page` and register the new span.
    pub fn create<L>(
        &mut self, layer: &mut L, page: usize, leaf: LeafId, range: Range<usize>,
    ) -> Result<HighlightId, LayerError>
    where
        L: TextLayer + ?Sized,
    {
        let span = layer.wrap_range(leaf, range)?;
        let id = HighlightId { slot: self.slots.len() as u32, generation: self.generation };
        self.slots.push(Highlight { span, page });
        Ok(id)
    }

    fn resolve(&self, id: HighlightId) -> Option<&Highlight> {
        if id.generation != self.generation {
            return None;
        }
        self.slots.get(id.slot as usize)
    }

    pub fn span(&self, id: HighlightId) -> Option<SpanRef> {
        self.resolve(id).map(|h| h.span)
    }

    pub fn page(&self, id: HighlightId) -> Option<usize> {
        self.resolve(id).map(|h| h.page)
    }

    pub fn rect<L>(&self, layer: &L, id: HighlightId) -> Result<Rect, LayerError>
    where
        L: TextLayer + ?Sized,
    {
        let span = self.span(id).ok_or(LayerError::StaleHighlight)?;
        layer.span_rect(span)
    }

    pub fn set_current<L>(&self, layer: &mut L, id: HighlightId, current: bool) -> Result<(), LayerError>
    where
        L: TextLayer + ?Sized,
    {
        let span = self.span(id).ok_or(LayerError::StaleHighlight)?;
        layer.set_span_current(span, current)
    }

    /// Unwrap every registered span, newest first, and invalidate all handles.
    ///
    /// Unwrap failures are logged and skipped so one bad span cannot leave
    /// the rest of the document marked up. Returns the number of spans removed.
    pub fn clear<L>(&mut self, layer: &mut L) -> usize
    where
        L: TextLayer + ?Sized,
    {
        let mut removed = 0;
        for highlight in self.slots.drain(..).rev() {
            match layer.unwrap_span(highlight.span) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(span = %highlight.span, error = %e, "failed to remove highlight"),
            }
        }
        self.generation = self.generation.wrapping_add(1);
        removed
    }
}
