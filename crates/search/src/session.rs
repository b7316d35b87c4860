//! Search session over one rendered document.
//!
//! Ties the pieces together: keyword edits are debounced before the index is
//! rebuilt, the document finishing loading (page count going from zero to
//! non-zero) rebuilds at once, and closing or dropping the session unwraps
//! every highlight so the layer is left as it was found.

use std::time::Duration;

use docshelf_core::AppConfig;
use serde::Serialize;

use crate::debounce::DebounceTimer;
use crate::highlight::HighlightRegistry;
use crate::index::{SearchMatch, build_index};
use crate::keyword::NormalizedKeyword;
use crate::layer::{Rect, SpanRef, TextLayer};
use crate::navigator::SearchNavigator;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    /// Quiet period after the last keyword edit before re-indexing.
    pub debounce: Duration,
    /// Sticky header height kept clear when scrolling to a match.
    pub header_offset: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce: DEFAULT_DEBOUNCE, header_offset: 0.0 }
    }
}

impl From<&AppConfig> for SearchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { debounce: config.search_debounce(), header_offset: config.header_offset }
    }
}

/// Snapshot of the session for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchState {
    pub keyword: String,
    pub matches: Vec<SearchMatch>,
    pub current_index: Option<usize>,
}

pub struct SearchSession<L: TextLayer> {
    layer: L,
    registry: HighlightRegistry,
    navigator: SearchNavigator,
    keyword: NormalizedKeyword,
    pending: Option<NormalizedKeyword>,
    debounce: DebounceTimer,
    page_count: usize,
    closed: bool,
}

impl<L: TextLayer> SearchSession<L> {
    /// A session over a document with no pages loaded yet.
    pub fn new(layer: L, config: &SearchConfig) -> Self {
        Self {
            layer,
            registry: HighlightRegistry::new(),
            navigator: SearchNavigator::new(config.header_offset),
            keyword: NormalizedKeyword::empty(),
            pending: None,
            debounce: DebounceTimer::new(config.debounce),
            page_count: 0,
            closed: false,
        }
    }

    pub fn layer(&self) -> &L {
        &self.layer
    }

    pub fn keyword(&self) -> &NormalizedKeyword {
        &self.keyword
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn matches(&self) -> &[SearchMatch] {
        self.navigator.matches()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.navigator.current_index()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// A keyword edit is waiting for the debounce to elapse.
    pub fn is_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn state(&self) -> SearchState {
        SearchState {
            keyword: self.keyword.keyword().to_string(),
            matches: self.navigator.matches().to_vec(),
            current_index: self.navigator.current_index(),
        }
    }

    pub fn span_of(&self, m: &SearchMatch) -> Option<SpanRef> {
        self.registry.span(m.highlight)
    }

    pub fn rect_of(&self, m: &SearchMatch) -> Option<Rect> {
        self.registry.rect(&self.layer, m.highlight).ok()
    }

    /// Record a keyword edit and (re)start the debounce.
    ///
    /// Must be called from within a Tokio runtime; drive the rebuild with
    /// [`settle`](Self::settle).
    pub fn set_keyword(&mut self, raw: &str, match_case: bool, whole_words: bool) {
        if self.closed {
            return;
        }
        self.pending = Some(NormalizedKeyword::new(raw, match_case, whole_words));
        self.debounce.start();
    }

    /// Wait out a pending debounce and rebuild with the newest keyword.
    ///
    /// Returns `false` immediately when no edit is pending.
    pub async fn settle(&mut self) -> bool {
        if !self.debounce.fired().await {
            return false;
        }
        if let Some(keyword) = self.pending.take() {
            self.keyword = keyword;
        }
        self.rebuild();
        true
    }

    /// Replace the keyword and rebuild without waiting, dropping any pending edit.
    pub fn apply_keyword(&mut self, keyword: NormalizedKeyword) {
        if self.closed {
            return;
        }
        self.debounce.cancel();
        self.pending = None;
        self.keyword = keyword;
        self.rebuild();
    }

    /// Report how many pages are rendered.
    ///
    /// Going from zero to some pages rebuilds immediately, adopting any
    /// pending keyword; going back to zero drops the index.
    pub fn set_page_count(&mut self, count: usize) {
        if self.closed {
            return;
        }
        let previous = std::mem::replace(&mut self.page_count, count);
        if previous == 0 && count > 0 {
            tracing::debug!(pages = count, "document loaded, indexing");
            self.debounce.cancel();
            if let Some(keyword) = self.pending.take() {
                self.keyword = keyword;
            }
            self.rebuild();
        } else if previous > 0 && count == 0 {
            self.registry.clear(&mut self.layer);
            self.navigator.reset(Vec::new());
        }
    }

    /// Rebuild the index for the active keyword. Returns the match count.
    pub fn rebuild(&mut self) -> usize {
        if self.closed {
            return 0;
        }
        let matches = build_index(&mut self.layer, &mut self.registry, &self.keyword, self.page_count);
        self.navigator.reset(matches);
        self.navigator.len()
    }

    pub fn next(&mut self) -> bool {
        self.navigator.next(&mut self.layer, &self.registry)
    }

    pub fn previous(&mut self) -> bool {
        self.navigator.previous(&mut self.layer, &self.registry)
    }

    pub fn jump_to(&mut self, index: usize) -> bool {
        self.navigator.jump_to(&mut self.layer, &self.registry, index)
    }

    /// Cancel pending work and remove every highlight. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.debounce.cancel();
        self.pending = None;
        let removed = self.registry.clear(&mut self.layer);
        self.navigator.reset(Vec::new());
        self.closed = true;
        tracing::debug!(removed, "search session closed");
    }
}

impl<L: TextLayer> Drop for SearchSession<L> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTextLayer;
    use tokio::time::Instant;

    fn document() -> MemoryTextLayer {
        let mut layer = MemoryTextLayer::default();
        layer.push_page(["a cat sat", "", "", "on the cat mat"]);
        layer.push_page(["no felines here"]);
        layer.push_page(["one more cat"]);
        layer
    }

    fn loaded(layer: &mut MemoryTextLayer) -> SearchSession<&mut MemoryTextLayer> {
        let pages = layer.page_count();
        let mut session = SearchSession::new(layer, &SearchConfig::default());
        session.set_page_count(pages);
        session
    }

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig { search_debounce_ms: 40, header_offset: 12.5, ..Default::default() };
        let config = SearchConfig::from(&app);
        assert_eq!(config.debounce, Duration::from_millis(40));
        assert_eq!(config.header_offset, 12.5);
        assert_eq!(SearchConfig::default().debounce, Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keyword_rebuild_is_debounced() {
        let mut layer = document();
        let mut session = loaded(&mut layer);

        let start = Instant::now();
        session.set_keyword("cat", false, false);
        assert!(session.matches().is_empty());
        assert!(session.settle().await);

        assert!(start.elapsed() >= Duration::from_millis(150));
        assert_eq!(session.matches().len(), 3);
        assert_eq!(session.current_index(), Some(0));
        assert!(!session.settle().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_keystroke_supersedes_pending() {
        let mut layer = document();
        let mut session = loaded(&mut layer);

        let start = Instant::now();
        session.set_keyword("c", false, false);
        tokio::time::advance(Duration::from_millis(100)).await;
        session.set_keyword("ca", false, false);
        tokio::time::advance(Duration::from_millis(100)).await;
        session.set_keyword("cat", false, false);

        assert!(session.settle().await);
        assert!(start.elapsed() >= Duration::from_millis(350));
        assert_eq!(session.keyword().keyword(), "cat");
        assert_eq!(session.matches().len(), 3);
        assert!(!session.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_keyword_removes_highlights() {
        let mut layer = document();
        let mut session = loaded(&mut layer);
        session.apply_keyword(NormalizedKeyword::new("cat", false, false));
        assert_eq!(session.layer().highlight_count(), 3);

        session.set_keyword("", false, false);
        assert!(session.settle().await);

        assert_eq!(session.current_index(), None);
        assert!(session.matches().is_empty());
        assert_eq!(session.layer().highlight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_load_indexes_immediately() {
        let mut layer = document();
        let pages = layer.page_count();
        let mut session = SearchSession::new(&mut layer, &SearchConfig::default());

        session.set_keyword("cat", false, false);
        session.set_page_count(pages);

        // no debounce wait needed
        assert_eq!(session.matches().len(), 3);
        assert!(!session.is_pending());
        assert!(!session.settle().await);
    }

    #[test]
    fn test_no_pages_no_matches() {
        let mut layer = document();
        let mut session = SearchSession::new(&mut layer, &SearchConfig::default());
        session.apply_keyword(NormalizedKeyword::new("cat", false, false));
        assert!(session.matches().is_empty());
        assert_eq!(session.current_index(), None);
    }

    #[test]
    fn test_unloading_drops_index() {
        let mut layer = document();
        let mut session = loaded(&mut layer);
        session.apply_keyword(NormalizedKeyword::new("cat", false, false));

        session.set_page_count(0);
        assert!(session.matches().is_empty());
        assert_eq!(session.layer().highlight_count(), 0);
    }

    #[test]
    fn test_navigation_through_session() {
        let mut layer = document();
        let mut session = loaded(&mut layer);
        session.apply_keyword(NormalizedKeyword::new("cat", false, false));

        assert!(session.previous());
        assert_eq!(session.current_index(), Some(2));
        let last = session.matches()[2];
        assert_eq!(last.page_index, 2);
        assert!(session.next());
        assert_eq!(session.current_index(), Some(0));
        assert!(session.jump_to(1));
        assert!(!session.jump_to(7));
        assert_eq!(session.state().current_index, Some(1));
        assert_eq!(session.layer().current_count(), 1);
    }

    #[test]
    fn test_close_restores_document() {
        let mut layer = document();
        let before: Vec<_> = (0..3).map(|p| layer.text_leaves(p).unwrap()).collect();
        {
            let mut session = loaded(&mut layer);
            session.apply_keyword(NormalizedKeyword::new("cat", false, false));
            session.close();
            assert!(session.is_closed());
            assert!(session.matches().is_empty());

            session.apply_keyword(NormalizedKeyword::new("cat", false, false));
            assert_eq!(session.layer().highlight_count(), 0);
        }
        let after: Vec<_> = (0..3).map(|p| layer.text_leaves(p).unwrap()).collect();
        assert_eq!(before, after);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_and_unwraps() {
        let mut layer = document();
        {
            let mut session = loaded(&mut layer);
            session.apply_keyword(NormalizedKeyword::new("cat", false, false));
            session.set_keyword("mat", false, false);
        }
        assert_eq!(layer.highlight_count(), 0);
        assert_eq!(layer.current_count(), 0);
        assert_eq!(layer.page_text(0).as_deref(), Some("a cat sat\n\n\non the cat mat"));
    }
}
