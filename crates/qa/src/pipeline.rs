//! The query pipeline: classify, retrieve or extract, prompt, generate,
//! enforce citations, persist.
//!
//! Every request runs synchronously end to end. The only retry anywhere is
//! the single regeneration attempt when a reply arrives without a
//! `Sources:` block; generator failures become descriptive replies chosen
//! by failure category and are still written to the session history.

use anyhow::Result;
use tracing::{debug, info, warn};

use dory_core::{Snippet, Turn};
use dory_index::{rank_sections, IndexHandle, Section, VaultIndex};
use dory_llm::{AnswerGenerator, GeneratorError};

use crate::config::Settings;
use crate::inclusion::{extract_inclusion_snippets, query_tokens, DEFAULT_SNIPPET_LIMIT};
use crate::intent;
use crate::price::{extract_price_items, filter_price_items};
use crate::prompt::{
    build_system_prompt, IDENTITY_LINE, NO_INFO_LINE, SOURCES_MARKER, SOURCES_RETRY_SUFFIX,
};
use crate::session::SessionStore;
use crate::snippet::{
    industry_count_snippets, price_snippets, snippets_from_sections, DEFAULT_EXCERPT_CHARS,
};
use crate::sources::ensure_sources;

/// Documents whose sections are expanded when price candidates come from
/// ranked search rather than an alias match.
const TOP_PRICE_PATHS: usize = 2;

/// Answer one query for the given session key and return the reply text.
pub fn answer_query(
    index: &IndexHandle,
    store: &SessionStore,
    generator: &dyn AnswerGenerator,
    settings: &Settings,
    user_id: &str,
    channel_id: &str,
    text: &str,
) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(String::new());
    }

    if intent::is_identity_question(text) {
        return reply_now(store, user_id, channel_id, text, IDENTITY_LINE.to_string());
    }

    let info_seeking = intent::is_info_seeking(text);
    let mut price_query = intent::is_price_query(text);

    let mut snippets: Vec<Snippet> = Vec::new();
    if info_seeking {
        let index = index.ensure_built();
        if intent::is_count_query(text) && intent::is_industry_query(text) {
            debug!("industry count lookup");
            snippets = industry_count_snippets(&index);
            if snippets.is_empty() {
                return reply_now(store, user_id, channel_id, text, NO_INFO_LINE.to_string());
            }
        } else if price_query {
            let (candidates, alias_paths) =
                price_candidates(&index, text, settings.max_snippets * 4);
            if candidates.is_empty() {
                return reply_now(store, user_id, channel_id, text, NO_INFO_LINE.to_string());
            }
            let mut items = extract_price_items(&candidates);
            if !items.is_empty() && alias_paths.is_empty() {
                items = filter_price_items(items, text);
            }
            if items.is_empty() {
                // downgrade to the inclusion path: the note may describe the
                // package without naming a price
                let inclusion =
                    extract_inclusion_snippets(&candidates, text, DEFAULT_SNIPPET_LIMIT);
                if inclusion.is_empty() {
                    return reply_now(store, user_id, channel_id, text, NO_INFO_LINE.to_string());
                }
                snippets = inclusion;
                price_query = false;
            } else {
                debug!(items = items.len(), "price items extracted");
                snippets = price_snippets(&items);
            }
        } else {
            let alias_paths = index.find_paths_by_alias(text);
            let candidates = if alias_paths.is_empty() {
                index.find_sections(text, settings.max_snippets)
            } else {
                rank_sections(
                    &index.sections_for_paths(&alias_paths),
                    text,
                    settings.max_snippets,
                )
            };
            if candidates.is_empty() {
                return reply_now(store, user_id, channel_id, text, NO_INFO_LINE.to_string());
            }
            snippets = snippets_from_sections(&candidates, DEFAULT_EXCERPT_CHARS);
        }
    }

    let mut conversation = store.history(user_id, channel_id);
    conversation.push(Turn::user(text));
    let system_prompt = build_system_prompt(info_seeking, price_query);

    let mut response = match generator.generate(&system_prompt, &conversation, &snippets) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(error = %err, "generator failed");
            return reply_now(store, user_id, channel_id, text, failure_reply(&err));
        }
    };

    if info_seeking {
        if response.trim() == NO_INFO_LINE {
            return reply_now(store, user_id, channel_id, text, response);
        }
        if !response.contains(SOURCES_MARKER) {
            info!("reply missing sources, regenerating once");
            let stronger = format!("{system_prompt}{SOURCES_RETRY_SUFFIX}");
            match generator.generate(&stronger, &conversation, &snippets) {
                Ok(retry) => response = retry,
                Err(err) => {
                    warn!(error = %err, "regeneration failed");
                    return reply_now(store, user_id, channel_id, text, failure_reply(&err));
                }
            }
        }
        let (amended, cited) = ensure_sources(&response, &snippets);
        response = amended;
        store.set_sources(user_id, channel_id, cited)?;
    }

    store.record_exchange(user_id, channel_id, text, &response)?;
    Ok(response)
}

/// The citation list stored by the most recent info-seeking reply for this
/// session key.
pub fn sources_for(store: &SessionStore, user_id: &str, channel_id: &str) -> Vec<String> {
    store.sources(user_id, channel_id)
}

fn reply_now(
    store: &SessionStore,
    user_id: &str,
    channel_id: &str,
    text: &str,
    reply: String,
) -> Result<String> {
    store.record_exchange(user_id, channel_id, text, &reply)?;
    Ok(reply)
}

/// Candidate sections for a price query. An alias hit pins whole documents;
/// otherwise a reduced-token search runs and the [`TOP_PRICE_PATHS`]
/// best-scoring documents are expanded to all their sections so a price
/// table two sections below the hit still gets scanned.
pub fn price_candidates(
    index: &VaultIndex,
    query: &str,
    max_sections: usize,
) -> (Vec<Section>, Vec<String>) {
    let alias_paths = index.find_paths_by_alias(query);
    if !alias_paths.is_empty() {
        return (index.sections_for_paths(&alias_paths), alias_paths);
    }

    let reduced: String = {
        let tokens = query_tokens(query);
        if tokens.is_empty() {
            query.to_string()
        } else {
            tokens.join(" ")
        }
    };
    let scored = index.find_sections(&reduced, max_sections);
    if scored.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let top_paths = select_top_paths(&scored, TOP_PRICE_PATHS);
    let expanded = index.sections_for_paths(&top_paths);
    if expanded.is_empty() {
        (scored, Vec::new())
    } else {
        (expanded, Vec::new())
    }
}

/// Paths ranked by the summed score of their hit sections.
fn select_top_paths(sections: &[Section], limit: usize) -> Vec<String> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    for section in sections {
        match totals.iter().position(|(path, _)| *path == section.path) {
            Some(pos) => totals[pos].1 += section.score,
            None => totals.push((section.path.clone(), section.score)),
        }
    }
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    totals.truncate(limit);
    totals.into_iter().map(|(path, _)| path).collect()
}

/// User-visible reply for a failed generation, chosen by failure category.
/// The wording stays recognizable for transports that surface it directly.
fn failure_reply(err: &GeneratorError) -> String {
    match err {
        GeneratorError::MissingBinary(bin) => {
            format!("Local answer binary '{bin}' not found. Check DORY_LOCAL_BIN.")
        }
        GeneratorError::TimedOut(_) => "Answer generation timed out.".to_string(),
        GeneratorError::Exec(detail) => format!("Local exec failed: {detail}"),
        GeneratorError::Api { status, body } => {
            format!("OpenAI API error: {status} {body}")
        }
        GeneratorError::Http(err) => format!("OpenAI API error: {err}"),
        GeneratorError::MissingCredential(var) => {
            format!("Answer backend is misconfigured: {var} is not set.")
        }
        GeneratorError::Runtime(detail) => format!("Answer backend failed: {detail}"),
    }
}
