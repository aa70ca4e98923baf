//! Note titles and alias derivation.
//!
//! Aliases are lowercased name variants used to short-circuit full-text
//! ranking when a query plainly names a document: the title and filename,
//! camel-case/number-boundary splits of both, and 2-/3-token prefixes of the
//! tokenized variants. A leading `gs` token followed by a digit token
//! collapses to `gs<digits>`, matching how codes like "GS1" are written.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use dory_core::word_pattern;

use crate::section::heading_text;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteMeta {
    pub path: String,
    pub title: String,
    pub aliases: Vec<String>,
}

static LOWER_UPPER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zæøå])([A-ZÆØÅ])").unwrap());
static DIGIT_LETTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9])([A-Za-zæøåÆØÅ])").unwrap());
static LETTER_DIGIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-zæøåÆØÅ])([0-9])").unwrap());
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Title of a note: the first heading with text, else the filename stem with
/// separators turned into spaces.
pub fn detect_title(lines: &[&str], filename: &str) -> String {
    for line in lines {
        if let Some(heading) = heading_text(line) {
            if !heading.is_empty() {
                return heading;
            }
        }
    }
    file_stem(filename).replace('_', " ").replace('-', " ")
}

fn file_stem(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename)
}

fn split_camel(text: &str) -> String {
    let text = LOWER_UPPER_RE.replace_all(text, "$1 $2");
    let text = DIGIT_LETTER_RE.replace_all(&text, "$1 $2");
    LETTER_DIGIT_RE.replace_all(&text, "$1 $2").into_owned()
}

pub fn build_aliases(title: &str, filename: &str) -> Vec<String> {
    let base = file_stem(filename);
    let mut variants: BTreeSet<String> = BTreeSet::new();
    variants.insert(title.to_string());
    variants.insert(base.to_string());
    variants.insert(base.replace('-', " "));
    variants.insert(base.replace('_', " "));

    let mut expanded: BTreeSet<String> = BTreeSet::new();
    for variant in variants {
        if variant.is_empty() {
            continue;
        }
        expanded.insert(split_camel(&variant));
        expanded.insert(variant);
    }

    let mut aliases: BTreeSet<String> = BTreeSet::new();
    for variant in expanded {
        let cleaned = SPACE_RE.replace_all(&variant, " ").trim().to_string();
        if cleaned.is_empty() {
            continue;
        }
        let lowered = cleaned.to_lowercase();
        let mut tokens: Vec<String> = word_pattern()
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect();
        aliases.insert(lowered);
        if tokens.len() >= 2 && tokens[0] == "gs" && tokens[1].chars().all(|c| c.is_ascii_digit())
        {
            let collapsed = format!("gs{}", tokens[1]);
            tokens.splice(0..2, [collapsed]);
        }
        if tokens.len() >= 2 {
            aliases.insert(tokens[..2].join(" "));
        }
        if tokens.len() >= 3 {
            aliases.insert(tokens[..3].join(" "));
        }
        if tokens.len() >= 2 && tokens[0].starts_with("gs1") {
            let end = tokens.len().min(3);
            aliases.insert(tokens[1..end].join(" "));
        }
    }

    aliases.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_first_heading() {
        let lines = vec!["preamble", "# GS1 Denmark", "body"];
        assert_eq!(detect_title(&lines, "whatever.md"), "GS1 Denmark");
    }

    #[test]
    fn title_falls_back_to_filename() {
        let lines = vec!["no heading here"];
        assert_eq!(detect_title(&lines, "GS1_Denmark-Overview.md"), "GS1 Denmark Overview");
    }

    #[test]
    fn camel_and_number_boundaries_split() {
        assert_eq!(split_camel("GS1DanmarkPriser"), "GS 1 Danmark Priser");
        assert_eq!(split_camel("abc123def"), "abc 123 def");
    }

    #[test]
    fn aliases_for_gs1_filename() {
        let aliases = build_aliases("GS1 Denmark Overview", "GS1_Denmark-Overview.md");
        // lowered full variants
        assert!(aliases.contains(&"gs1 denmark overview".to_string()));
        assert!(aliases.contains(&"gs1_denmark-overview".to_string()));
        // gs+digit collapse feeding token prefixes
        assert!(aliases.contains(&"gs1 denmark".to_string()));
        // gs1-prefixed variants also alias the tail tokens
        assert!(aliases.contains(&"denmark overview".to_string()));
    }

    #[test]
    fn short_prefix_aliases_are_present() {
        let aliases = build_aliases("Medlemskab og Priser", "Medlemskab_og_Priser.md");
        assert!(aliases.contains(&"medlemskab og".to_string()));
        assert!(aliases.contains(&"medlemskab og priser".to_string()));
    }
}
