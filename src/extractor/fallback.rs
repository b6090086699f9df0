use std::collections::HashSet;
use std::sync::LazyLock;

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};

use super::text::rendered_text;

/// Case-sensitive anchors a fallback match must contain. These are the
/// literal labels the portal prints on every record.
const ANCHORS: &[&str] = &["Processo:", "Acórdão"];

static ANY_ELEMENT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("*").unwrap());

/// Scan every element for anchor text inside the length window, then keep
/// only outermost matches. The window excludes menu fragments on the low
/// end and whole-page containers on the high end; both bounds are
/// exclusive. A match nested inside another match is redundant with its
/// container's larger text and is dropped.
pub fn scan(doc: &Html, min_chars: usize, max_chars: usize) -> Vec<ElementRef<'_>> {
    let matched: Vec<ElementRef> = doc
        .select(&ANY_ELEMENT)
        .filter(|el| {
            let text = rendered_text(*el);
            let len = text.chars().count();
            len > min_chars && len < max_chars && ANCHORS.iter().any(|a| text.contains(a))
        })
        .collect();

    let ids: HashSet<NodeId> = matched.iter().map(|el| el.id()).collect();
    matched
        .into_iter()
        .filter(|el| el.ancestors().all(|a| !ids.contains(&a.id())))
        .collect()
}

// ── Tests ──
