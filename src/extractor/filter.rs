use std::sync::LazyLock;

use regex::Regex;

/// CNJ case-number format: NNNNNNN-DD.YYYY.J.TR.OOOO. A match is a
/// high-confidence signal that a text block is a real case record.
static CNJ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{7}-\d{2}\.\d{4}\.\d\.\d{2}\.\d{4}").unwrap());

/// Keywords matched case-insensitively against the candidate text.
const KEYWORDS: &[&str] = &["processo", "acórdão"];

/// A candidate is worth keeping if it mentions a case at all, or carries
/// a CNJ number even without the words.
pub fn is_relevant(text: &str) -> bool {
    let lower = text.to_lowercase();
    KEYWORDS.iter().any(|kw| lower.contains(kw)) || CNJ_RE.is_match(text)
}

pub fn has_case_number(text: &str) -> bool {
    CNJ_RE.is_match(text)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_any_case() {
        assert!(is_relevant("PROCESSO em segredo de justiça"));
        assert!(is_relevant("Inteiro teor do Acórdão disponível"));
        assert!(is_relevant("ACÓRDÃO mantido pela turma"));
    }

    #[test]
    fn case_number_alone() {
        assert!(is_relevant("1234567-89.2023.8.07.0001"));
        assert!(has_case_number("autos nº 0701234-56.2022.8.07.0010 em trâmite"));
    }

    #[test]
    fn neither_keyword_nor_number() {
        assert!(!is_relevant("Resultados da pesquisa ordenados por relevância"));
        assert!(!has_case_number("123456-89.2023.8.07.0001")); // six digits, not seven
    }

    #[test]
    fn malformed_numbers_rejected() {
        assert!(!has_case_number("1234567-89.2023.88.07.0001"));
        assert!(!has_case_number("1234567-89-2023.8.07.0001"));
    }
}
