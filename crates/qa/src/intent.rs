//! Query intent classification.
//!
//! Pure, case-insensitive predicates over the raw query text. The keyword
//! tables are bilingual (English + Danish) and kept as data so new markers
//! are a one-line change. The classifications are independent; precedence
//! between them is the pipeline's business.

const IDENTITY_PATTERNS: &[&str] = &[
    "hvem er du",
    "hvad hedder du",
    "what's your name",
    "what is your name",
    "who are you",
];

const INFO_KEYWORDS: &[&str] = &[
    "price",
    "pricing",
    "pakke",
    "package",
    "service",
    "policy",
    "politik",
    "proces",
    "process",
    "procedure",
    "how",
    "what",
    "where",
    "hvad",
    "hvordan",
    "hvor",
    "cost",
    "pris",
    "priser",
    "timeline",
    "tidslinje",
    "find",
    "show",
    "tell me",
    "forklar",
    "vis",
];

const PRICE_MARKERS: &[&str] = &[
    "pris",
    "priser",
    "price",
    "pricing",
    "pakke",
    "pakker",
    "package",
    "packages",
    "abonnement",
    "abonnements",
    "gebyr",
    "fee",
    "fees",
    "cost",
    "costs",
    "koster",
    "hvad koster",
];

const COUNT_MARKERS: &[&str] = &["how many", "hvor mange", "antal", "number of", "count"];

const INDUSTRY_MARKERS: &[&str] = &[
    "branche",
    "brancher",
    "industri",
    "industrier",
    "industries",
    "sektor",
    "sektorer",
];

fn contains_any(text_lower: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| text_lower.contains(marker))
}

/// "Who are you" / "what is your name" questions get a fixed reply with no
/// retrieval at all.
pub fn is_identity_question(text: &str) -> bool {
    let text_lower = text.to_lowercase();
    let text_lower = text_lower.trim();
    contains_any(text_lower, IDENTITY_PATTERNS)
}

/// Whether the query warrants vault retrieval at all; everything else is
/// plain conversation.
pub fn is_info_seeking(text: &str) -> bool {
    let text_lower = text.to_lowercase();
    text_lower.contains('?') || contains_any(&text_lower, INFO_KEYWORDS)
}

pub fn is_price_query(text: &str) -> bool {
    contains_any(&text.to_lowercase(), PRICE_MARKERS)
}

pub fn is_count_query(text: &str) -> bool {
    contains_any(&text.to_lowercase(), COUNT_MARKERS)
}

pub fn is_industry_query(text: &str) -> bool {
    contains_any(&text.to_lowercase(), INDUSTRY_MARKERS)
}

/// All independent flags for one query, evaluated once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intent {
    pub identity: bool,
    pub info_seeking: bool,
    pub price: bool,
    pub count: bool,
    pub industry: bool,
}

pub fn classify(text: &str) -> Intent {
    Intent {
        identity: is_identity_question(text),
        info_seeking: is_info_seeking(text),
        price: is_price_query(text),
        count: is_count_query(text),
        industry: is_industry_query(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_in_both_languages() {
        assert!(is_identity_question("Hvem er du egentlig?"));
        assert!(is_identity_question("So, who are you?"));
        assert!(!is_identity_question("who is the CEO?"));
    }

    #[test]
    fn question_mark_is_info_seeking() {
        assert!(is_info_seeking("noget helt andet?"));
        assert!(!is_info_seeking("god morgen"));
    }

    #[test]
    fn keywords_are_info_seeking() {
        assert!(is_info_seeking("forklar processen"));
        assert!(is_info_seeking("show the timeline"));
    }

    #[test]
    fn price_markers() {
        assert!(is_price_query("hvad koster basis pakken"));
        assert!(is_price_query("any subscription fees involved"));
        assert!(!is_price_query("who runs the office"));
    }

    #[test]
    fn count_and_industry_are_independent() {
        let intent = classify("How many industries are listed?");
        assert!(intent.count);
        assert!(intent.industry);
        assert!(intent.info_seeking);
        assert!(!intent.identity);

        assert!(is_count_query("antal medlemmer"));
        assert!(!is_industry_query("antal medlemmer"));
    }
}
