//! Citation parsing and enforcement on generated replies.

use dory_core::Snippet;

use crate::prompt::SOURCES_MARKER;

/// Number of snippets cited when a fallback block has to be synthesized.
const FALLBACK_SOURCES: usize = 3;

/// Citation strings listed under the reply's `Sources:` marker. Lines are
/// collected until the first non-list line after the marker.
pub fn parse_sources(text: &str) -> Vec<String> {
    if !text.contains(SOURCES_MARKER) {
        return Vec::new();
    }
    let mut sources = Vec::new();
    let mut capture = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with(SOURCES_MARKER) {
            capture = true;
            continue;
        }
        if !capture {
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('-') {
            sources.push(trimmed.chars().skip(2).collect());
        } else {
            break;
        }
    }
    sources
}

/// Guarantee the reply carries citations: keep the generator's own block
/// when present, otherwise synthesize one from the first
/// [`FALLBACK_SOURCES`] snippets. Returns the (possibly amended) reply and
/// the citation list that was used.
pub fn ensure_sources(response: &str, snippets: &[Snippet]) -> (String, Vec<String>) {
    let sources = parse_sources(response);
    if !sources.is_empty() {
        return (response.to_string(), sources);
    }

    let base = match response.find(SOURCES_MARKER) {
        Some(pos) => response[..pos].trim_end(),
        None => response,
    };

    let fallback: Vec<String> = snippets
        .iter()
        .take(FALLBACK_SOURCES)
        .map(Snippet::citation)
        .collect();
    if fallback.is_empty() {
        return (response.to_string(), fallback);
    }

    let block = fallback
        .iter()
        .map(|src| format!("- {src}"))
        .collect::<Vec<_>>()
        .join("\n");
    let amended = format!("{}\n\n{}\n{}", base.trim_end(), SOURCES_MARKER, block);
    (amended, fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(path: &str) -> Snippet {
        Snippet {
            path: path.to_string(),
            heading: "Pakker".to_string(),
            line_start: 1,
            line_end: 3,
            excerpt: String::new(),
            score: 1.0,
        }
    }

    #[test]
    fn parses_listed_sources() {
        let text = "Answer here.\n\nSources:\n- a.md#H (lines 1-2)\n- b.md#K (lines 3-4)\ntrailing";
        assert_eq!(
            parse_sources(text),
            vec!["a.md#H (lines 1-2)", "b.md#K (lines 3-4)"]
        );
    }

    #[test]
    fn parse_stops_at_non_list_line() {
        let text = "Sources:\n- first.md#A (lines 1-1)\nnot a source\n- second.md#B (lines 2-2)";
        assert_eq!(parse_sources(text), vec!["first.md#A (lines 1-1)"]);
    }

    #[test]
    fn no_marker_means_no_sources() {
        assert!(parse_sources("just an answer").is_empty());
    }

    #[test]
    fn existing_sources_are_kept() {
        let text = "Answer.\n\nSources:\n- a.md#H (lines 1-2)";
        let (out, sources) = ensure_sources(text, &[snippet("z.md")]);
        assert_eq!(out, text);
        assert_eq!(sources, vec!["a.md#H (lines 1-2)"]);
    }

    #[test]
    fn fallback_synthesizes_up_to_three() {
        let snippets = vec![snippet("a.md"), snippet("b.md"), snippet("c.md"), snippet("d.md")];
        let (out, sources) = ensure_sources("An answer.", &snippets);
        assert_eq!(sources.len(), 3);
        assert!(out.ends_with(
            "Sources:\n- a.md#Pakker (lines 1-3)\n- b.md#Pakker (lines 1-3)\n- c.md#Pakker (lines 1-3)"
        ));
    }

    #[test]
    fn empty_marker_tail_is_replaced() {
        let (out, sources) = ensure_sources("Answer.\n\nSources:\n", &[snippet("a.md")]);
        assert_eq!(sources, vec!["a.md#Pakker (lines 1-3)"]);
        assert!(out.contains("Sources:\n- a.md#Pakker (lines 1-3)"));
        assert_eq!(out.matches("Sources:").count(), 1);
    }

    #[test]
    fn no_snippets_leaves_reply_untouched() {
        let (out, sources) = ensure_sources("Answer.", &[]);
        assert_eq!(out, "Answer.");
        assert!(sources.is_empty());
    }
}
