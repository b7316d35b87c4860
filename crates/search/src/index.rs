//! Match index construction.

use serde::Serialize;

use crate::LayerError;
use crate::highlight::{HighlightId, HighlightRegistry};
use crate::keyword::NormalizedKeyword;
use crate::layer::TextLayer;

/// One occurrence of the active keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// 0-based page the match was found on.
    pub page_index: usize,
    pub highlight: HighlightId,
}

/// Rebuild the match index for `keyword` over the first `page_count` pages.
///
/// Highlights from the previous index are removed first. Matches are wrapped
/// last-to-first within each leaf so earlier offsets stay valid, then sorted
/// into reading order by on-screen position. The first match is marked
/// current. If the layer rejects any step, every highlight created so far is
/// removed and the index is empty.
pub fn build_index<L>(
    layer: &mut L, registry: &mut HighlightRegistry, keyword: &NormalizedKeyword, page_count: usize,
) -> Vec<SearchMatch>
where
    L: TextLayer + ?Sized,
{
    let cleared = registry.clear(layer);
    if cleared > 0 {
        tracing::debug!(cleared, "removed previous highlights");
    }

    if keyword.is_empty() || page_count == 0 {
        return Vec::new();
    }

    match collect_matches(layer, registry, keyword, page_count) {
        Ok(matches) => {
            tracing::debug!(keyword = keyword.keyword(), pages = page_count, matches = matches.len(), "search index built");
            matches
        }
        Err(e) => {
            let rolled_back = registry.clear(layer);
            tracing::warn!(keyword = keyword.keyword(), error = %e, rolled_back, "search indexing failed");
            Vec::new()
        }
    }
}

fn collect_matches<L>(
    layer: &mut L, registry: &mut HighlightRegistry, keyword: &NormalizedKeyword, page_count: usize,
) -> Result<Vec<SearchMatch>, LayerError>
where
    L: TextLayer + ?Sized,
{
    let mut found = Vec::new();
    for page_index in 0..page_count {
        for leaf in layer.text_leaves(page_index)? {
            if leaf.in_highlight {
                tracing::debug!(leaf = %leaf.id, "skipping leaf inside an existing highlight");
                continue;
            }
            for range in keyword.find_ranges(&leaf.text).into_iter().rev() {
                let highlight = registry.create(layer, page_index, leaf.id, range)?;
                found.push(SearchMatch { page_index, highlight });
            }
        }
    }

    let mut placed = found
        .into_iter()
        .map(|m| registry.rect(&*layer, m.highlight).map(|rect| (m, rect)))
        .collect::<Result<Vec<_>, _>>()?;
    placed.sort_by(|(_, a), (_, b)| a.top.total_cmp(&b.top).then(a.left.total_cmp(&b.left)));

    let matches: Vec<SearchMatch> = placed.into_iter().map(|(m, _)| m).collect();
    if let Some(first) = matches.first() {
        registry.set_current(layer, first.highlight, true)?;
    }
    Ok(matches)
}
