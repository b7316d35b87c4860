//! In-memory rendered document.
//!
//! Lays out plain text as pages of single-line runs with a fixed glyph
//! advance. Each run starts as one leaf; wrapping a range splits the leaf
//! into prefix, highlight, and suffix leaves that share the run, and
//! unwrapping merges neighbouring plain leaves of the same run back into one.
//! The prefix keeps the original leaf id, so a fully unwrapped layer is
//! indistinguishable from a fresh one.

use std::ops::Range;

use crate::LayerError;
use crate::layer::{LeafId, Rect, SpanRef, TextLayer, TextLeaf};

/// Geometry used to position runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    /// Minimum page height; longer pages grow to fit their lines.
    pub page_height: f32,
    pub line_height: f32,
    pub glyph_advance: f32,
    pub margin: f32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self { page_height: 1056.0, line_height: 16.0, glyph_advance: 8.0, margin: 48.0 }
    }
}

/// Where a highlight sits in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanLocation {
    pub page: usize,
    /// 0-based line within the page.
    pub line: usize,
    /// 0-based character column within the line.
    pub column: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    span: SpanRef,
    current: bool,
}

#[derive(Debug, Clone)]
struct Node {
    id: LeafId,
    line: usize,
    column: usize,
    text: String,
    mark: Option<Mark>,
}

#[derive(Debug, Clone)]
struct Page {
    top: f32,
    height: f32,
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct MemoryTextLayer {
    metrics: LayoutMetrics,
    pages: Vec<Page>,
    next_leaf: u64,
    next_span: u64,
    scroll_top: f32,
    wraps_before_failure: Option<usize>,
}

impl Default for MemoryTextLayer {
    fn default() -> Self {
        Self::new(LayoutMetrics::default())
    }
}

impl MemoryTextLayer {
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self { metrics, pages: Vec::new(), next_leaf: 0, next_span: 0, scroll_top: 0.0, wraps_before_failure: None }
    }

    /// Build a document from plain text: form feeds separate pages and
    /// newlines separate lines.
    pub fn from_text(text: &str) -> Self {
        let mut layer = Self::default();
        for page in text.split('\x0c') {
            layer.push_page(page.lines());
        }
        layer
    }

    /// Append a page with one run per line.
    pub fn push_page<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let top = self.pages.last().map_or(0.0, |p| p.top + p.height);
        let mut nodes = Vec::new();
        for (line, text) in lines.into_iter().enumerate() {
            let text = text.into();
            if text.is_empty() {
                continue;
            }
            let id = self.fresh_leaf();
            nodes.push(Node { id, line, column: 0, text, mark: None });
        }

        let lines_used = nodes.last().map_or(0, |n| n.line + 1);
        let content = 2.0 * self.metrics.margin + lines_used as f32 * self.metrics.line_height;
        let height = self.metrics.page_height.max(content);
        self.pages.push(Page { top, height, nodes });
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn metrics(&self) -> LayoutMetrics {
        self.metrics
    }

    /// Number of live highlight spans.
    pub fn highlight_count(&self) -> usize {
        self.nodes().filter(|n| n.mark.is_some()).count()
    }

    /// Number of spans carrying the current-match styling.
    pub fn current_count(&self) -> usize {
        self.nodes().filter(|n| n.mark.is_some_and(|m| m.current)).count()
    }

    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    /// Text of `page` with lines joined by newlines.
    pub fn page_text(&self, page: usize) -> Option<String> {
        let page = self.pages.get(page)?;
        let mut out = String::new();
        let mut line = 0;
        for node in &page.nodes {
            while line < node.line {
                out.push('\n');
                line += 1;
            }
            out.push_str(&node.text);
        }
        Some(out)
    }

    pub fn locate(&self, span: SpanRef) -> Option<SpanLocation> {
        let (page, index) = self.find_span(span)?;
        let node = &self.pages[page].nodes[index];
        Some(SpanLocation { page, line: node.line, column: node.column, text: node.text.clone() })
    }

    /// Make the wrap after the next `n` successful ones fail.
    pub fn fail_wrap_after(&mut self, n: usize) {
        self.wraps_before_failure = Some(n);
    }

    fn fresh_leaf(&mut self) -> LeafId {
        let id = LeafId(self.next_leaf);
        self.next_leaf += 1;
        id
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.pages.iter().flat_map(|p| p.nodes.iter())
    }

    fn find_leaf(&self, leaf: LeafId) -> Option<(usize, usize)> {
        self.pages
            .iter()
            .enumerate()
            .find_map(|(p, page)| page.nodes.iter().position(|n| n.id == leaf).map(|i| (p, i)))
    }

    fn find_span(&self, span: SpanRef) -> Option<(usize, usize)> {
        self.pages.iter().enumerate().find_map(|(p, page)| {
            page.nodes
                .iter()
                .position(|n| n.mark.is_some_and(|m| m.span == span))
                .map(|i| (p, i))
        })
    }

    fn rect_of(&self, page: &Page, node: &Node) -> Rect {
        let m = &self.metrics;
        Rect {
            top: page.top + m.margin + node.line as f32 * m.line_height,
            left: m.margin + node.column as f32 * m.glyph_advance,
            width: node.text.chars().count() as f32 * m.glyph_advance,
            height: m.line_height,
        }
    }

    fn check_injected_failure(&mut self) -> Result<(), LayerError> {
        match self.wraps_before_failure {
            Some(0) => {
                self.wraps_before_failure = None;
                Err(LayerError::Render("injected wrap failure".into()))
            }
            Some(n) => {
                self.wraps_before_failure = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl TextLayer for MemoryTextLayer {
    fn text_leaves(&self, page: usize) -> Result<Vec<TextLeaf>, LayerError> {
        let count = self.pages.len();
        let page = self.pages.get(page).ok_or(LayerError::PageOutOfRange { page, count })?;
        Ok(page
            .nodes
            .iter()
            .map(|n| TextLeaf { id: n.id, text: n.text.clone(), in_highlight: n.mark.is_some() })
            .collect())
    }

    fn wrap_range(&mut self, leaf: LeafId, range: Range<usize>) -> Result<SpanRef, LayerError> {
        let (p, i) = self.find_leaf(leaf).ok_or(LayerError::UnknownLeaf(leaf))?;
        let invalid = LayerError::InvalidRange { leaf, start: range.start, end: range.end };
        {
            let node = &self.pages[p].nodes[i];
            if node.mark.is_some()
                || range.start >= range.end
                || range.end > node.text.len()
                || !node.text.is_char_boundary(range.start)
                || !node.text.is_char_boundary(range.end)
            {
                return Err(invalid);
            }
        }
        self.check_injected_failure()?;

        let span = SpanRef(self.next_span);
        self.next_span += 1;
        let marked_id = self.fresh_leaf();
        let suffix_id = self.fresh_leaf();

        let nodes = &mut self.pages[p].nodes;
        let node = &mut nodes[i];
        let suffix = node.text.split_off(range.end);
        let marked = node.text.split_off(range.start);
        let marked_column = node.column + node.text.chars().count();
        let suffix_column = marked_column + marked.chars().count();
        let line = node.line;

        nodes.insert(
            i + 1,
            Node {
                id: marked_id,
                line,
                column: marked_column,
                text: marked,
                mark: Some(Mark { span, current: false }),
            },
        );
        if !suffix.is_empty() {
            nodes.insert(i + 2, Node { id: suffix_id, line, column: suffix_column, text: suffix, mark: None });
        }
        Ok(span)
    }

    fn unwrap_span(&mut self, span: SpanRef) -> Result<(), LayerError> {
        let (p, i) = self.find_span(span).ok_or(LayerError::UnknownSpan(span))?;
        let nodes = &mut self.pages[p].nodes;
        nodes[i].mark = None;

        if i + 1 < nodes.len() && nodes[i + 1].line == nodes[i].line && nodes[i + 1].mark.is_none() {
            let next = nodes.remove(i + 1);
            nodes[i].text.push_str(&next.text);
        }
        if i > 0 && nodes[i - 1].line == nodes[i].line && nodes[i - 1].mark.is_none() {
            let merged = nodes.remove(i);
            nodes[i - 1].text.push_str(&merged.text);
        }
        Ok(())
    }

    fn span_rect(&self, span: SpanRef) -> Result<Rect, LayerError> {
        let (p, i) = self.find_span(span).ok_or(LayerError::UnknownSpan(span))?;
        let page = &self.pages[p];
        Ok(self.rect_of(page, &page.nodes[i]))
    }

    fn set_span_current(&mut self, span: SpanRef, current: bool) -> Result<(), LayerError> {
        let (p, i) = self.find_span(span).ok_or(LayerError::UnknownSpan(span))?;
        if let Some(mark) = self.pages[p].nodes[i].mark.as_mut() {
            mark.current = current;
        }
        Ok(())
    }

    fn scroll_to_page(&mut self, page: usize, header_offset: f32) -> Result<(), LayerError> {
        let count = self.pages.len();
        let top = self.pages.get(page).ok_or(LayerError::PageOutOfRange { page, count })?.top;
        self.scroll_top = (top - header_offset).max(0.0);
        Ok(())
    }
}
