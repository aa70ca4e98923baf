//! Heading-delimited document segmentation.
//!
//! A section is a contiguous run of lines bounded by ATX headings (1-6 `#`
//! characters plus text) or by document start/end. Sections of one document
//! are contiguous, non-overlapping, and together cover every line.

use once_cell::sync::Lazy;
use regex::Regex;

/// Heading label used when no heading governs a span.
pub const TOP_HEADING: &str = "(top)";

static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s+(.*)$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub path: String,
    pub heading: String,
    /// 1-based inclusive line range within the source document.
    pub line_start: usize,
    pub line_end: usize,
    pub text: String,
    /// Relevance score for the query that produced this section; zero
    /// outside a query context.
    pub score: f64,
}

/// Raw heading text of `line`, if it is a heading line. May be empty; the
/// `(top)` fallback is applied when sections are built.
pub fn heading_text(line: &str) -> Option<String> {
    HEADING_RE
        .captures(line.trim())
        .map(|caps| caps[1].trim().to_string())
}

/// Split a document's lines into sections. An empty document yields no
/// sections; a document with no headings yields exactly one `(top)` section
/// spanning the whole file; content before the first heading becomes its own
/// `(top)` section rather than merging with the first heading.
pub fn split_sections(path: &str, lines: &[&str]) -> Vec<Section> {
    if lines.is_empty() {
        return Vec::new();
    }

    let boundaries: Vec<(usize, String)> = lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            heading_text(line).map(|heading| {
                let heading = if heading.is_empty() {
                    TOP_HEADING.to_string()
                } else {
                    heading
                };
                (idx, heading)
            })
        })
        .collect();

    let make = |heading: &str, start_idx: usize, end_idx: usize| Section {
        path: path.to_string(),
        heading: heading.to_string(),
        line_start: start_idx + 1,
        line_end: end_idx + 1,
        text: lines[start_idx..=end_idx].join("\n").trim().to_string(),
        score: 0.0,
    };

    if boundaries.is_empty() {
        return vec![make(TOP_HEADING, 0, lines.len() - 1)];
    }

    let mut sections = Vec::with_capacity(boundaries.len() + 1);
    if boundaries[0].0 > 0 {
        sections.push(make(TOP_HEADING, 0, boundaries[0].0 - 1));
    }
    for (i, (start_idx, heading)) in boundaries.iter().enumerate() {
        let end_idx = boundaries
            .get(i + 1)
            .map(|(next, _)| next - 1)
            .unwrap_or(lines.len() - 1);
        sections.push(make(heading, *start_idx, end_idx));
    }
    sections
}
