use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Ranked result-card selectors, most specific first. The portal has
/// shipped several markups over time: bespoke card classes, plain
/// articles, Angular component tags, Material cards.
pub const RESULT_CARD_SELECTORS: &[&str] = &[
    ".card-resultado",
    ".resultado-item",
    "article",
    "app-resultado-item",
    "[class*=\"card\"]",
    "[class*=\"resultado\"]",
    "[class*=\"item\"]",
    "mat-card",
    ".mat-card",
];

/// Try each selector in priority order; the first one with at least one
/// match wins and the rest are never consulted. Matches come back in
/// document order.
pub fn scan<'a>(
    doc: &'a Html,
    selectors: &[String],
) -> Result<Option<(String, Vec<ElementRef<'a>>)>> {
    for raw in selectors {
        let selector =
            Selector::parse(raw).map_err(|e| anyhow!("invalid selector {:?}: {}", raw, e))?;
        let matches: Vec<ElementRef> = doc.select(&selector).collect();
        if !matches.is_empty() {
            return Ok(Some((raw.clone(), matches)));
        }
        debug!(selector = raw.as_str(), "no matches");
    }
    Ok(None)
}

// ── Tests ──
