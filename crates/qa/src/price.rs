//! Price extraction from semi-structured Markdown.
//!
//! Recognizes two line shapes: table rows (split into cells, first
//! price-bearing cell wins) and plain lines (price pattern plus optional
//! per/inclusive continuation). Names come from a deterministic fallback
//! chain: the price line itself, then the other table cells, then a backward
//! scan over up to four preceding label lines. Generic labels ("Pris",
//! "Pakker", ...) never become names.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use dory_index::Section;

use crate::inclusion::query_tokens;

static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d[\d.,]*)\s*(dkk|kr\.?|\bkr\b)").unwrap());
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LETTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-zæøåÆØÅ]").unwrap());

const LABEL_STOP: &[&str] = &[
    "pris",
    "price",
    "abonnement",
    "billedpakker",
    "certificering",
    "pakker",
    "pakken",
];

const CONTINUATION_PREFIXES: &[&str] = &["inkl", "inkl.", "inklusive", "pr.", "pr", "per", "/"];

const YEAR_ONLY_NAMES: &[&str] = &["/ år", "/ aar", "/år", "pr. år", "pr år"];

const MAX_LABEL_LINES: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceItem {
    pub name: String,
    pub price: String,
    pub path: String,
    pub heading: String,
    pub line_start: usize,
    pub line_end: usize,
}

fn clean_text(text: &str) -> String {
    let text = LINK_RE.replace_all(text, "$1");
    let text = text.replace("**", "").replace('*', "");
    let text = text
        .trim()
        .trim_matches(|c: char| matches!(c, '-' | ':' | '•' | '\t' | ' '));
    SPACE_RE.replace_all(text, " ").trim().to_string()
}

fn has_letters(text: &str) -> bool {
    LETTER_RE.is_match(text)
}

fn is_stop_label(text: &str) -> bool {
    let cleaned = text.to_lowercase();
    let cleaned = cleaned.trim_matches(|c: char| matches!(c, ' ' | ':' | '\t'));
    LABEL_STOP.contains(&cleaned)
}

/// The price token in `line`, extended with up to two following words when a
/// per/inclusive continuation follows the match.
fn extract_price_from_line(line: &str) -> Option<String> {
    let m = PRICE_RE.find(line)?;
    let mut price = m.as_str().trim().to_string();
    let suffix = line[m.end()..].trim();
    if !suffix.is_empty() {
        let words: Vec<&str> = suffix.split_whitespace().collect();
        if let Some(first) = words.first() {
            let first_lower = first.to_lowercase();
            if first.starts_with('/')
                || first_lower.starts_with("pr")
                || first_lower.starts_with("per")
            {
                let tail = words[..words.len().min(2)].join(" ");
                price = format!("{price} {tail}").trim().to_string();
            }
        }
    }
    Some(price)
}

/// Item name derived from a price line (or table cell), with the price text
/// stripped out. Empty when nothing label-worthy remains.
fn name_from_line(line: &str, price: Option<&str>) -> String {
    if line.is_empty() {
        return String::new();
    }
    let mut cleaned = clean_text(line);
    if let Some(price) = price {
        cleaned = cleaned.replace(price, "").trim().to_string();
    }
    let cleaned = cleaned
        .trim_matches(|c: char| matches!(c, '-' | ':' | '•' | '\t' | ' '))
        .to_string();
    if cleaned.is_empty() {
        return String::new();
    }
    let lowered = cleaned.to_lowercase();
    if is_stop_label(&lowered) {
        return String::new();
    }
    if YEAR_ONLY_NAMES.contains(&lowered.as_str()) {
        return String::new();
    }
    if !has_letters(&cleaned) {
        return String::new();
    }
    if cleaned.chars().count() <= 2 {
        return String::new();
    }
    cleaned
}

/// Backward label scan: up to [`MAX_LABEL_LINES`] preceding non-blank,
/// non-heading lines, skipping generic labels, joined in original order.
fn collect_label(lines: &[&str], idx: usize) -> String {
    let mut collected: Vec<String> = Vec::new();
    let mut j = idx as isize - 1;
    while j >= 0 && collected.len() < MAX_LABEL_LINES {
        let raw = lines[j as usize].trim();
        if raw.is_empty() {
            if !collected.is_empty() {
                break;
            }
            j -= 1;
            continue;
        }
        if raw.starts_with('#') {
            j -= 1;
            continue;
        }
        let candidate = clean_text(raw);
        if candidate.is_empty() || is_stop_label(&candidate) {
            j -= 1;
            continue;
        }
        collected.insert(0, candidate);
        j -= 1;
    }
    collected.join(" ").trim().to_string()
}

/// Cells of a Markdown table row; `None` for non-rows, pure separator rows,
/// and rows with no non-empty cells.
fn parse_table_row(line: &str) -> Option<Vec<String>> {
    if !line.contains('|') {
        return None;
    }
    let stripped = line.trim();
    if stripped.is_empty() {
        return None;
    }
    if stripped.chars().all(|c| matches!(c, '|' | '-' | ':' | ' ')) {
        return None;
    }
    let cells: Vec<String> = stripped
        .trim_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .filter(|cell| !cell.is_empty())
        .collect();
    if cells.is_empty() {
        return None;
    }
    Some(cells)
}

fn starts_with_continuation(name: &str) -> bool {
    let lowered = name.to_lowercase();
    CONTINUATION_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

/// Scan sections for price-bearing lines and rows, pairing each price with
/// a label. Output is deduplicated by (path, heading, name, price,
/// line_start) and sorted by (path, line_start); running it twice over the
/// same sections yields identical results.
pub fn extract_price_items(sections: &[Section]) -> Vec<PriceItem> {
    let mut items: Vec<PriceItem> = Vec::new();
    for section in sections {
        let lines: Vec<&str> = section.text.lines().collect();
        for (idx, line) in lines.iter().enumerate() {
            if let Some(cells) = parse_table_row(line) {
                let price_cell = cells.iter().find(|cell| PRICE_RE.is_match(cell));
                if let Some(price_cell) = price_cell {
                    let price = extract_price_from_line(price_cell);
                    let mut name = String::new();
                    for cell in &cells {
                        if cell == price_cell {
                            continue;
                        }
                        let candidate = name_from_line(cell, None);
                        if !candidate.is_empty() && !is_stop_label(&candidate) {
                            name = candidate;
                            break;
                        }
                    }
                    if name.is_empty() {
                        name = collect_label(&lines, idx);
                    }
                    if let Some(price) = price {
                        if !name.is_empty() {
                            items.push(make_item(section, idx, name, price));
                        }
                    }
                }
                continue;
            }

            let Some(price) = extract_price_from_line(line) else {
                continue;
            };
            let mut name = name_from_line(line, Some(&price));
            if name.is_empty() {
                name = collect_label(&lines, idx);
            }
            if name.is_empty() {
                continue;
            }
            if starts_with_continuation(&name) {
                let extended = collect_label(&lines, idx);
                if !extended.is_empty() && extended != name {
                    name = extended;
                }
            }
            items.push(make_item(section, idx, name, price));
        }
    }

    let mut deduped: Vec<PriceItem> = items
        .into_iter()
        .unique_by(|item| {
            (
                item.path.clone(),
                item.heading.clone(),
                item.name.clone(),
                item.price.clone(),
                item.line_start,
            )
        })
        .collect();
    deduped.sort_by(|a, b| {
        a.path
            .cmp(&b.path)
            .then(a.line_start.cmp(&b.line_start))
    });
    deduped
}

fn make_item(section: &Section, idx: usize, name: String, price: String) -> PriceItem {
    PriceItem {
        name,
        price,
        path: section.path.clone(),
        heading: section.heading.clone(),
        line_start: section.line_start + idx.saturating_sub(1),
        line_end: section.line_start + idx,
    }
}

/// Keep only items whose name mentions a query token; with no usable tokens
/// everything is kept. The survivors are deduplicated by (name, price) so
/// the same package listed in several notes renders once.
pub fn filter_price_items(items: Vec<PriceItem>, query: &str) -> Vec<PriceItem> {
    let tokens = query_tokens(query);
    if tokens.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| {
            let name_lower = item.name.to_lowercase();
            tokens.iter().any(|token| name_lower.contains(token))
        })
        .unique_by(|item| (item.name.to_lowercase(), item.price.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(heading: &str, text: &str) -> Section {
        Section {
            path: "Pricing.md".to_string(),
            heading: heading.to_string(),
            line_start: 10,
            line_end: 10 + text.lines().count(),
            text: text.to_string(),
            score: 0.0,
        }
    }

    #[test]
    fn table_row_yields_name_and_price() {
        let sections = vec![section("Pricing", "| Basis | 499 kr. |")];
        let items = extract_price_items(&sections);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Basis");
        assert_eq!(items[0].price, "499 kr.");
        assert_eq!(items[0].heading, "Pricing");
        assert_eq!(items[0].line_start, 10);
        assert_eq!(items[0].line_end, 10);
    }

    #[test]
    fn separator_rows_are_ignored() {
        let text = "| Pakke | Pris |\n|---|---:|\n| Mellem | 1.200 kr. |";
        let items = extract_price_items(&[section("Priser", text)]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Mellem");
        assert_eq!(items[0].price, "1.200 kr.");
    }

    #[test]
    fn plain_line_price_with_continuation() {
        let items = extract_price_items(&[section("Abonnement", "Basis 499 kr. pr. år")]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Basis");
        assert_eq!(items[0].price, "499 kr. pr. år");
    }

    #[test]
    fn backward_label_collection_skips_stop_labels() {
        let text = "Stor pakke til kæder\nPris\n1.999 kr.";
        let items = extract_price_items(&[section("Pakker", text)]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Stor pakke til kæder");
    }

    #[test]
    fn markdown_markup_is_stripped_from_names() {
        let items =
            extract_price_items(&[section("Pakker", "**[Lille pakke](https://x.dk)** 299 kr.")]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Lille pakke");
    }

    #[test]
    fn nameless_prices_are_dropped() {
        // no letters, too short, or stoplisted names never survive
        let text = "123 499 kr.\nPakker 999 kr.";
        let items = extract_price_items(&[section("Priser", text)]);
        assert!(items.iter().all(|item| !item.name.is_empty()));
        assert!(items.iter().all(|item| item.name != "Pakker"));
    }

    #[test]
    fn extraction_is_idempotent_and_sorted() {
        let a = section("Priser", "| Basis | 499 kr. |\n| Plus | 899 kr. |");
        let mut b = section("Priser", "| Basis | 499 kr. |");
        b.path = "Andet.md".to_string();
        let sections = vec![b, a];
        let first = extract_price_items(&sections);
        let second = extract_price_items(&sections);
        assert_eq!(first, second);
        let paths: Vec<_> = first.iter().map(|item| item.path.as_str()).collect();
        assert_eq!(paths, vec!["Andet.md", "Pricing.md", "Pricing.md"]);
    }

    #[test]
    fn duplicate_rows_dedupe() {
        let text = "| Basis | 499 kr. |";
        let sections = vec![section("Priser", text), section("Priser", text)];
        let items = extract_price_items(&sections);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn filter_retains_matching_names() {
        let items = extract_price_items(&[section(
            "Priser",
            "| Basis | 499 kr. |\n| Premium | 1.999 kr. |",
        )]);
        let filtered = filter_price_items(items, "hvad koster Basis pakken");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Basis");
    }

    #[test]
    fn filter_with_no_tokens_keeps_everything() {
        let items = extract_price_items(&[section("Priser", "| Basis | 499 kr. |")]);
        let filtered = filter_price_items(items.clone(), "hvad koster det?");
        assert_eq!(filtered, items);
    }
}
