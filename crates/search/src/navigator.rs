//! Cursor over the match index.

use crate::highlight::HighlightRegistry;
use crate::index::SearchMatch;
use crate::layer::TextLayer;

/// Tracks which match is current and moves the current-highlight styling.
///
/// `current` is `None` exactly when there are no matches. Layer failures
/// while restyling or scrolling are logged; the cursor still moves.
#[derive(Debug, Default)]
pub struct SearchNavigator {
    matches: Vec<SearchMatch>,
    current: Option<usize>,
    header_offset: f32,
}

impl SearchNavigator {
    pub fn new(header_offset: f32) -> Self {
        Self { matches: Vec::new(), current: None, header_offset }
    }

    /// Adopt a freshly built index whose first match is already styled current.
    pub fn reset(&mut self, matches: Vec<SearchMatch>) {
        self.current = if matches.is_empty() { None } else { Some(0) };
        self.matches = matches;
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&SearchMatch> {
        self.current.and_then(|i| self.matches.get(i))
    }

    /// Make match `index` current and scroll its page into view.
    ///
    /// Returns `false` without touching anything when `index` is out of range.
    pub fn jump_to<L>(&mut self, layer: &mut L, registry: &HighlightRegistry, index: usize) -> bool
    where
        L: TextLayer + ?Sized,
    {
        let Some(target) = self.matches.get(index).copied() else {
            return false;
        };

        if let Some(previous) = self.current()
            && let Err(e) = registry.set_current(layer, previous.highlight, false)
        {
            tracing::warn!(error = %e, "failed to clear current highlight");
        }
        if let Err(e) = registry.set_current(layer, target.highlight, true) {
            tracing::warn!(index, error = %e, "failed to mark current highlight");
        }
        self.current = Some(index);

        if let Err(e) = layer.scroll_to_page(target.page_index, self.header_offset) {
            tracing::warn!(page = target.page_index, error = %e, "failed to scroll to match");
        }
        true
    }

    pub fn next<L>(&mut self, layer: &mut L, registry: &HighlightRegistry) -> bool
    where
        L: TextLayer + ?Sized,
    {
        let len = self.matches.len();
        if len == 0 {
            return false;
        }
        let index = self.current.map_or(0, |i| (i + 1) % len);
        self.jump_to(layer, registry, index)
    }

    pub fn previous<L>(&mut self, layer: &mut L, registry: &HighlightRegistry) -> bool
    where
        L: TextLayer + ?Sized,
    {
        let len = self.matches.len();
        if len == 0 {
            return false;
        }
        let index = self.current.map_or(len - 1, |i| (i + len - 1) % len);
        self.jump_to(layer, registry, index)
    }
}
