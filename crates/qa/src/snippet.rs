//! Assembly of ranked sections and extracted items into [`Snippet`]s.

use dory_core::{clip_chars, Snippet};
use dory_index::{Section, VaultIndex};

use crate::price::PriceItem;

/// Character budget for a section excerpt before truncation.
pub const DEFAULT_EXCERPT_CHARS: usize = 1600;

/// Score assigned to snippets that were selected deterministically rather
/// than ranked; keeps them ahead of any lexical hit.
const PINNED_SCORE: f64 = 999.0;

/// Filename suffix of the industry index note.
const INDUSTRY_INDEX_SUFFIX: &str = "gs1dk brancher index.md";
const INDUSTRY_PAGES_HEADING: &str = "pages";
const INDUSTRY_LIST_PREFIX: &str = "- [[";
const INDUSTRY_LIST_MAX: usize = 20;

/// One snippet per section, with the body trimmed and clipped to
/// `max_chars`.
pub fn snippets_from_sections(sections: &[Section], max_chars: usize) -> Vec<Snippet> {
    sections
        .iter()
        .map(|section| {
            let trimmed = section.text.trim();
            let (clipped, cut) = clip_chars(trimmed, max_chars);
            let excerpt = if cut {
                format!("{}\n...", clipped.trim_end())
            } else {
                trimmed.to_string()
            };
            Snippet {
                path: section.path.clone(),
                heading: section.heading.clone(),
                line_start: section.line_start,
                line_end: section.line_end,
                excerpt,
                score: section.score,
            }
        })
        .collect()
}

/// Collapse extracted price items into one snippet per (path, heading)
/// group, listing `name — price` pairs, spanning the group's line range.
pub fn price_snippets(items: &[PriceItem]) -> Vec<Snippet> {
    let mut groups: Vec<((&str, &str), Vec<&PriceItem>)> = Vec::new();
    for item in items {
        let key = (item.path.as_str(), item.heading.as_str());
        match groups.iter().position(|(existing, _)| *existing == key) {
            Some(pos) => groups[pos].1.push(item),
            None => groups.push((key, vec![item])),
        }
    }

    groups
        .into_iter()
        .map(|((path, heading), members)| {
            let excerpt = members
                .iter()
                .map(|item| format!("{} — {}", item.name, item.price))
                .collect::<Vec<_>>()
                .join("\n");
            let line_start = members.iter().map(|item| item.line_start).min().unwrap_or(1);
            let line_end = members.iter().map(|item| item.line_end).max().unwrap_or(1);
            Snippet {
                path: path.to_string(),
                heading: heading.to_string(),
                line_start,
                line_end,
                excerpt,
                score: PINNED_SCORE,
            }
        })
        .collect()
}

/// Deterministic lookup for "how many industries" questions: counts the
/// bullet entries of the industry index note's Pages section. Empty when
/// the note, section, or list is absent.
pub fn industry_count_snippets(index: &VaultIndex) -> Vec<Snippet> {
    let Some(target_path) = index
        .notes()
        .map(|meta| meta.path.as_str())
        .find(|path| path.to_lowercase().ends_with(INDUSTRY_INDEX_SUFFIX))
    else {
        return Vec::new();
    };

    let Some(pages_section) = index.sections().iter().find(|section| {
        section.path == target_path && section.heading.to_lowercase() == INDUSTRY_PAGES_HEADING
    }) else {
        return Vec::new();
    };

    let list_lines: Vec<&str> = pages_section
        .text
        .lines()
        .filter(|line| line.trim().starts_with(INDUSTRY_LIST_PREFIX))
        .collect();
    if list_lines.is_empty() {
        return Vec::new();
    }

    let mut excerpt_lines = vec![format!("Antal brancher i index: {}", list_lines.len())];
    excerpt_lines.extend(
        list_lines
            .iter()
            .take(INDUSTRY_LIST_MAX)
            .map(|line| line.to_string()),
    );

    vec![Snippet {
        path: pages_section.path.clone(),
        heading: pages_section.heading.clone(),
        line_start: pages_section.line_start,
        line_end: pages_section.line_end,
        excerpt: excerpt_lines.join("\n"),
        score: PINNED_SCORE,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(path: &str, heading: &str, text: &str) -> Section {
        Section {
            path: path.to_string(),
            heading: heading.to_string(),
            line_start: 1,
            line_end: text.lines().count().max(1),
            text: text.to_string(),
            score: 7.0,
        }
    }

    #[test]
    fn short_sections_pass_through() {
        let snippets = snippets_from_sections(&[section("a.md", "H", "  body text  ")], 1600);
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].excerpt, "body text");
        assert_eq!(snippets[0].score, 7.0);
    }

    #[test]
    fn long_sections_get_ellipsis() {
        let text = "x".repeat(50);
        let snippets = snippets_from_sections(&[section("a.md", "H", &text)], 10);
        assert_eq!(snippets[0].excerpt, format!("{}\n...", "x".repeat(10)));
    }

    #[test]
    fn price_snippets_group_by_path_and_heading() {
        let items = vec![
            PriceItem {
                name: "Basis".into(),
                price: "499 kr.".into(),
                path: "Pricing.md".into(),
                heading: "Pakker".into(),
                line_start: 4,
                line_end: 5,
            },
            PriceItem {
                name: "Plus".into(),
                price: "899 kr.".into(),
                path: "Pricing.md".into(),
                heading: "Pakker".into(),
                line_start: 6,
                line_end: 7,
            },
            PriceItem {
                name: "Enterprise".into(),
                price: "2.000 kr.".into(),
                path: "Enterprise.md".into(),
                heading: "Priser".into(),
                line_start: 2,
                line_end: 3,
            },
        ];
        let snippets = price_snippets(&items);
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].excerpt, "Basis — 499 kr.\nPlus — 899 kr.");
        assert_eq!((snippets[0].line_start, snippets[0].line_end), (4, 7));
        assert_eq!(snippets[0].score, 999.0);
        assert_eq!(snippets[1].path, "Enterprise.md");
    }
}
