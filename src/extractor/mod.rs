pub mod fallback;
pub mod filter;
pub mod selectors;
pub mod text;

use std::fmt;

use anyhow::Result;
use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};

use text::rendered_text;

/// Separator written between records in the output blob. Downstream
/// splitting depends on this literal never occurring inside a record.
pub const SENTINEL: &str = "\n\n===SEPARADOR_PROCESSO===\n\n";

/// Minimum rendered length for a candidate to count as a record.
pub const DEFAULT_MIN_CHARS: usize = 50;
/// Fallback text-scan length window, exclusive on both ends.
pub const DEFAULT_FALLBACK_MIN: usize = 100;
pub const DEFAULT_FALLBACK_MAX: usize = 8000;

/// Named knobs for the extraction heuristic. The defaults mirror the
/// portal layouts the built-in selector list was written against; the
/// portal's markup changes independently of this logic, so every one of
/// them can be overridden from the command line.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub min_chars: usize,
    pub fallback_min: usize,
    pub fallback_max: usize,
    /// Selectors tried before the built-in ranked list, in the order given.
    pub extra_selectors: Vec<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
            fallback_min: DEFAULT_FALLBACK_MIN,
            fallback_max: DEFAULT_FALLBACK_MAX,
            extra_selectors: Vec::new(),
        }
    }
}

/// Which stage produced the candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    Selector(String),
    TextScan,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateSource::Selector(s) => write!(f, "selector {}", s),
            CandidateSource::TextScan => write!(f, "anchor-text scan"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanStats {
    /// Candidates the filter looked at.
    pub analyzed: usize,
    pub accepted: usize,
    /// Long enough, but neither keyword nor case number.
    pub rejected: usize,
    /// Empty rendering or below the minimum length.
    pub skipped: usize,
}

impl ScanStats {
    pub fn absorb(&mut self, other: &ScanStats) {
        self.analyzed += other.analyzed;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.skipped += other.skipped;
    }
}

/// Terminal states of one extraction run. The two empty cases are kept
/// apart because the operator guidance differs: no candidates usually
/// means the page was saved before it finished loading, while rejected
/// candidates mean the heuristics do not fit this layout.
#[derive(Debug, Clone)]
pub enum ExtractOutcome {
    Records {
        chunks: Vec<String>,
        source: CandidateSource,
        stats: ScanStats,
    },
    NoCandidates,
    NoneRelevant {
        stats: ScanStats,
    },
}

/// Run the full heuristic over a parsed page: ranked selector scan,
/// anchor-text fallback, then the per-candidate relevance filter.
/// Pure apart from diagnostics; chunks come back in document order.
pub fn extract_records(doc: &Html, opts: &ExtractOptions) -> Result<ExtractOutcome> {
    let selector_list: Vec<String> = opts
        .extra_selectors
        .iter()
        .cloned()
        .chain(selectors::RESULT_CARD_SELECTORS.iter().map(|s| s.to_string()))
        .collect();

    let (source, candidates) = match selectors::scan(doc, &selector_list)? {
        Some((selector, matches)) => {
            info!(selector = selector.as_str(), count = matches.len(), "result cards matched");
            (CandidateSource::Selector(selector), matches)
        }
        None => {
            info!("no selector matched, scanning elements by anchor text");
            let matches = fallback::scan(doc, opts.fallback_min, opts.fallback_max);
            if matches.is_empty() {
                return Ok(ExtractOutcome::NoCandidates);
            }
            info!(count = matches.len(), "elements matched by anchor text");
            (CandidateSource::TextScan, matches)
        }
    };

    let mut stats = ScanStats {
        analyzed: candidates.len(),
        ..ScanStats::default()
    };
    let mut chunks = Vec::new();

    for (i, el) in candidates.into_iter().enumerate() {
        let Some(text) = candidate_text(el) else {
            warn!(candidate = i, "empty rendering, skipping");
            stats.skipped += 1;
            continue;
        };
        if i == 0 {
            debug!(sample = %truncate(&text, 200), "first candidate");
        }
        if text.chars().count() < opts.min_chars {
            stats.skipped += 1;
            continue;
        }
        if filter::is_relevant(&text) {
            stats.accepted += 1;
            chunks.push(text);
        } else {
            stats.rejected += 1;
        }
    }

    if chunks.is_empty() {
        return Ok(ExtractOutcome::NoneRelevant { stats });
    }

    Ok(ExtractOutcome::Records {
        chunks,
        source,
        stats,
    })
}

/// Rendering comes back empty for icon-only or placeholder nodes; the
/// caller counts those as skipped instead of aborting the run.
fn candidate_text(el: ElementRef) -> Option<String> {
    let text = rendered_text(el);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn join_chunks(chunks: &[String], separator: &str) -> String {
    chunks.join(separator)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> ExtractOutcome {
        let doc = Html::parse_document(html);
        extract_records(&doc, &ExtractOptions::default()).unwrap()
    }

    fn records(outcome: &ExtractOutcome) -> (&[String], &CandidateSource, &ScanStats) {
        match outcome {
            ExtractOutcome::Records { chunks, source, stats } => (chunks, source, stats),
            other => panic!("expected records, got {:?}", other),
        }
    }

    #[test]
    fn length_boundary_at_minimum() {
        // 49 rendered chars is dropped, exactly 50 is kept.
        let html = format!(
            r#"<div class="card-resultado">processo {}</div><div class="card-resultado">processo {}</div>"#,
            "a".repeat(40),
            "a".repeat(41),
        );
        let outcome = extract(&html);
        let (chunks, _, stats) = records(&outcome);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chars().count(), 50);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.accepted, 1);
    }

    #[test]
    fn keyword_or_number_is_required() {
        let html = r#"<div class="card-resultado">Resultados refletem os filtros aplicados na pesquisa; refine os termos para ver outras entradas.</div>"#;
        match extract(html) {
            ExtractOutcome::NoneRelevant { stats } => {
                assert_eq!(stats.analyzed, 1);
                assert_eq!(stats.rejected, 1);
            }
            other => panic!("expected none relevant, got {:?}", other),
        }
    }

    #[test]
    fn case_number_alone_is_accepted() {
        let html = format!(
            r#"<div class="card-resultado">1234567-89.2023.8.07.0001 {}</div>"#,
            "x".repeat(30),
        );
        let outcome = extract(&html);
        let (chunks, _, _) = records(&outcome);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("1234567-89.2023.8.07.0001"));
    }

    #[test]
    fn selector_priority_ignores_later_matches() {
        // app-resultado-item (4th) and mat-card (8th/9th, plus the
        // class-substring selectors) both match; the 4th wins and the
        // stray mat-card is never analyzed.
        let html = format!(
            r#"<app-resultado-item>Processo: {}</app-resultado-item>
               <app-resultado-item>Acórdão {}</app-resultado-item>
               <mat-card class="mat-card">Processo: {}</mat-card>"#,
            "a".repeat(60),
            "b".repeat(60),
            "c".repeat(60),
        );
        let outcome = extract(&html);
        let (chunks, source, stats) = records(&outcome);
        assert_eq!(
            *source,
            CandidateSource::Selector("app-resultado-item".to_string())
        );
        assert_eq!(chunks.len(), 2);
        assert_eq!(stats.analyzed, 2);
    }

    #[test]
    fn extra_selectors_take_precedence() {
        let html = r#"<div class="meu-card">Processo: 0701234-56.2023.8.07.0001, apelação cível, decisão unânime.</div>
                      <div class="card-resultado">Processo: 0709999-99.2023.8.07.0001, agravo interno, decisão por maioria.</div>"#;
        let doc = Html::parse_document(html);
        let opts = ExtractOptions {
            extra_selectors: vec![".meu-card".to_string()],
            ..ExtractOptions::default()
        };
        let outcome = extract_records(&doc, &opts).unwrap();
        let (chunks, source, _) = records(&outcome);
        assert_eq!(*source, CandidateSource::Selector(".meu-card".to_string()));
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("apelação"));
    }

    #[test]
    fn fallback_keeps_outermost_match_only() {
        let inner = format!("Processo: 0701234-56.2023.8.07.0001 {}", "mérito ".repeat(20));
        let html = format!(
            r#"<div id="lista"><div class="bloco">{}</div><div class="bloco">Acórdão {}</div></div><p>{}</p>"#,
            inner,
            "n".repeat(120),
            "x".repeat(9000),
        );
        let outcome = extract(&html);
        let (chunks, source, _) = records(&outcome);
        assert_eq!(*source, CandidateSource::TextScan);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("Processo:"));
        assert!(chunks[0].contains("Acórdão"));
    }

    #[test]
    fn empty_page_has_no_candidates() {
        match extract("<p>Nenhuma entrada encontrada para os termos informados.</p>") {
            ExtractOutcome::NoCandidates => {}
            other => panic!("expected no candidates, got {:?}", other),
        }
    }

    #[test]
    fn sentinel_round_trip() {
        let chunks = vec![
            "Processo: 0701234-56.2023.8.07.0001\nEmenta: fornecimento de medicamento.".to_string(),
            "Acórdão 180234, 2ª Turma Cível.".to_string(),
            "Processo: 0709876-54.2022.8.07.0010".to_string(),
        ];
        let blob = join_chunks(&chunks, SENTINEL);
        let back: Vec<&str> = blob.split(SENTINEL).collect();
        assert_eq!(back.len(), chunks.len());
        for (original, recovered) in chunks.iter().zip(back) {
            assert_eq!(original, recovered);
        }
    }

    // ── Fixture pages ──

    fn fixture(name: &str) -> ExtractOutcome {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
        extract(&html)
    }

    #[test]
    fn cards_fixture() {
        let outcome = fixture("cards");
        let (chunks, source, stats) = records(&outcome);
        assert_eq!(
            *source,
            CandidateSource::Selector(".card-resultado".to_string())
        );
        assert_eq!(stats.analyzed, 5);
        assert_eq!(stats.accepted, 3);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(chunks.len(), 3);
        // Document order survives.
        assert!(chunks[0].contains("0701234-56.2023.8.07.0001"));
        assert!(chunks[2].contains("0712345-67.2021.8.07.0007"));
    }

    #[test]
    fn material_fixture() {
        let outcome = fixture("material");
        let (chunks, source, _) = records(&outcome);
        assert_eq!(
            *source,
            CandidateSource::Selector("app-resultado-item".to_string())
        );
        // Two result items; the sidebar mat-card is not analyzed.
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| !c.contains("Filtros da pesquisa")));
    }

    #[test]
    fn plain_fixture_uses_fallback() {
        let outcome = fixture("plain");
        let (chunks, source, _) = records(&outcome);
        assert_eq!(*source, CandidateSource::TextScan);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("0701234-56.2023.8.07.0001"));
        assert!(chunks[1].contains("0709876-54.2022.8.07.0010"));
    }

    #[test]
    fn empty_fixture_has_no_candidates() {
        match fixture("empty") {
            ExtractOutcome::NoCandidates => {}
            other => panic!("expected no candidates, got {:?}", other),
        }
    }
}
