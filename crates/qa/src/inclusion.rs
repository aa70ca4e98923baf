//! Fallback retrieval for "is X included?"-style questions.
//!
//! When price extraction finds nothing, lines that mention both a query
//! term and an inclusion marker ("inkl", "gratis", ...) are emitted as
//! 3-line window snippets instead.

use std::collections::BTreeSet;

use dory_core::{stem, tokenize, Snippet};
use dory_index::Section;

const INCLUSION_MARKERS: &[&str] = &[
    "inkl",
    "inkl.",
    "inklusive",
    "gratis",
    "medlemskab",
    "medlem",
    "uden ekstra",
];

/// Question words and generic price vocabulary that carry no retrieval
/// signal on their own.
const QUERY_STOPWORDS: &[&str] = &[
    "hvad", "hvor", "hvem", "hvordan", "det", "for", "til", "et", "en", "den", "der", "som",
    "at", "og", "the", "what", "where", "how", "does", "do", "is", "are", "a", "an", "of", "it",
    "cost", "costs", "koster", "pris", "priser", "price", "pricing", "pakke", "pakker",
    "package", "packages", "abonnement", "abonnements",
];

/// Domain codes short enough to fail the length filter but worth keeping.
const SHORT_KEEP: &[&str] = &["gln", "gtin", "gdsn", "sscc"];

pub const DEFAULT_SNIPPET_LIMIT: usize = 4;

/// Query terms that survive stopword and length filtering, each accompanied
/// by its stemmed variant when that differs. Sorted and deduplicated.
pub fn query_tokens(query: &str) -> Vec<String> {
    let mut tokens: BTreeSet<String> = BTreeSet::new();
    for token in tokenize(query) {
        if QUERY_STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        if token.chars().count() < 3 && !SHORT_KEEP.contains(&token.as_str()) {
            continue;
        }
        let normalized = stem(&token);
        if normalized != token {
            tokens.insert(normalized);
        }
        tokens.insert(token);
    }
    tokens.into_iter().collect()
}

/// Scan sections for lines naming a query term together with an inclusion
/// marker; each hit becomes a one-line-of-context window. Stops after
/// `limit` snippets.
pub fn extract_inclusion_snippets(
    sections: &[Section],
    query: &str,
    limit: usize,
) -> Vec<Snippet> {
    let tokens = query_tokens(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut snippets = Vec::new();
    for section in sections {
        let lines: Vec<&str> = section.text.lines().collect();
        for (idx, line) in lines.iter().enumerate() {
            let line_lower = line.to_lowercase();
            if !tokens.iter().any(|token| line_lower.contains(token)) {
                continue;
            }
            if !INCLUSION_MARKERS
                .iter()
                .any(|marker| line_lower.contains(marker))
            {
                continue;
            }
            let start_idx = idx.saturating_sub(1);
            let end_idx = (idx + 1).min(lines.len() - 1);
            snippets.push(Snippet {
                path: section.path.clone(),
                heading: section.heading.clone(),
                line_start: section.line_start + start_idx,
                line_end: section.line_start + end_idx,
                excerpt: lines[start_idx..=end_idx].join("\n").trim().to_string(),
                score: section.score,
            });
            if snippets.len() >= limit {
                return snippets;
            }
        }
    }
    snippets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(text: &str) -> Section {
        Section {
            path: "Medlemskab.md".to_string(),
            heading: "Fordele".to_string(),
            line_start: 5,
            line_end: 5 + text.lines().count(),
            text: text.to_string(),
            score: 3.0,
        }
    }

    #[test]
    fn tokens_filter_stopwords_and_short_words() {
        let tokens = query_tokens("hvad koster en GLN og certificering?");
        assert!(tokens.contains(&"gln".to_string()));
        assert!(tokens.contains(&"certificering".to_string()));
        assert!(!tokens.iter().any(|t| t == "hvad" || t == "koster" || t == "og" || t == "en"));
    }

    #[test]
    fn tokens_include_stemmed_variants() {
        let tokens = query_tokens("stregkoder");
        assert!(tokens.contains(&"stregkoder".to_string()));
        assert!(tokens.contains(&"stregkod".to_string()));
    }

    #[test]
    fn no_usable_tokens_yields_no_snippets() {
        let sections = vec![section("stregkoder er inkl. i pakken")];
        assert!(extract_inclusion_snippets(&sections, "hvad koster det?", 4).is_empty());
    }

    #[test]
    fn marker_and_token_must_share_a_line() {
        let text = "intro\nstregkoder er inkl. i medlemskabet\nslut";
        let hits = extract_inclusion_snippets(&[section(text)], "stregkoder", 4);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].excerpt, "intro\nstregkoder er inkl. i medlemskabet\nslut");
        assert_eq!((hits[0].line_start, hits[0].line_end), (5, 7));
        assert_eq!(hits[0].score, 3.0);

        let no_marker = "stregkoder findes her";
        assert!(extract_inclusion_snippets(&[section(no_marker)], "stregkoder", 4).is_empty());
    }

    #[test]
    fn stops_at_limit() {
        let text = "a inkl. stregkode\nb inkl. stregkode\nc inkl. stregkode";
        let hits = extract_inclusion_snippets(&[section(text)], "stregkode", 2);
        assert_eq!(hits.len(), 2);
    }
}
