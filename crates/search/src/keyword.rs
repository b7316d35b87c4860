//! Keyword normalization.
//!
//! A search keyword is always matched literally. The raw query is escaped,
//! compiled with the requested case mode, and optionally anchored to word
//! boundaries.

use std::ops::Range;

use regex::{Regex, RegexBuilder};

/// A search term compiled into a literal matcher.
///
/// An empty keyword has no matcher and matches nothing.
#[derive(Debug, Clone)]
pub struct NormalizedKeyword {
    keyword: String,
    matcher: Option<Regex>,
    match_case: bool,
    whole_words: bool,
}

impl NormalizedKeyword {
    pub fn new(raw: &str, match_case: bool, whole_words: bool) -> Self {
        let matcher = if raw.is_empty() { None } else { compile(raw, match_case, whole_words) };
        Self { keyword: raw.to_string(), matcher, match_case, whole_words }
    }

    pub fn empty() -> Self {
        Self::new("", false, false)
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn match_case(&self) -> bool {
        self.match_case
    }

    pub fn whole_words(&self) -> bool {
        self.whole_words
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_none()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.as_ref().is_some_and(|m| m.is_match(text))
    }

    /// Byte ranges of every non-overlapping match in `text`, left to right.
    pub fn find_ranges(&self, text: &str) -> Vec<Range<usize>> {
        match &self.matcher {
            Some(m) => m.find_iter(text).map(|found| found.range()).collect(),
            None => Vec::new(),
        }
    }
}

impl Default for NormalizedKeyword {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for NormalizedKeyword {
    fn eq(&self, other: &Self) -> bool {
        self.keyword == other.keyword && self.match_case == other.match_case && self.whole_words == other.whole_words
    }
}

/// Whole-word mode uses half word-boundary assertions so a keyword at the
/// very start or end of a leaf still matches, and punctuation-edged keywords
/// like `-x` only need a non-word character on their outer side.
fn compile(raw: &str, match_case: bool, whole_words: bool) -> Option<Regex> {
    let literal = regex::escape(raw);
    let pattern = if whole_words { format!(r"\b{{start-half}}{literal}\b{{end-half}}") } else { literal };

    match RegexBuilder::new(&pattern).case_insensitive(!match_case).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(keyword = raw, error = %e, "keyword could not be compiled, matching nothing");
            None
        }
    }
}
