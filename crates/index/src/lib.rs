//! In-memory lexical index over a vault of Markdown notes.
//!
//! [`VaultIndex::build`] walks the vault root, splits every `.md` file into
//! heading-delimited [`Section`]s and derives per-note [`NoteMeta`]. Queries
//! score sections lexically with structural boosts; alias hits can bypass
//! ranking entirely. An index is immutable once built; [`IndexHandle`] swaps
//! whole snapshots so readers never observe a partial rebuild.

mod alias;
mod section;

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use walkdir::WalkDir;

use dory_core::{clip_chars, tokenize, Result, VaultError};

pub use alias::{build_aliases, detect_title, NoteMeta};
pub use section::{heading_text, split_sections, Section, TOP_HEADING};

const ALIAS_BOOST: f64 = 20.0;
const PHRASE_BONUS: f64 = 8.0;
const HEADING_WEIGHT: f64 = 3.0;
const PATH_WEIGHT: f64 = 2.0;

#[derive(Debug, Default)]
pub struct VaultIndex {
    root: Option<PathBuf>,
    sections: Vec<Section>,
    notes: BTreeMap<String, NoteMeta>,
}

impl VaultIndex {
    /// An index with no content; every lookup returns empty results.
    pub fn empty(root: Option<PathBuf>) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    /// Walk `root` and index every Markdown file beneath it. A missing or
    /// non-directory root yields an empty index rather than an error; a file
    /// that cannot be read cleanly is decoded lossily or treated as empty.
    pub fn build(root: Option<&Path>) -> Self {
        let Some(root) = root else {
            return Self::empty(None);
        };
        if !root.is_dir() {
            return Self::empty(Some(root.to_path_buf()));
        }

        let mut sections = Vec::new();
        let mut notes = BTreeMap::new();
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !file_name.to_lowercase().ends_with(".md") {
                continue;
            }
            let rel_path = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();
            let content = read_lossy(entry.path());
            let lines: Vec<&str> = content.lines().collect();

            let title = detect_title(&lines, &file_name);
            let aliases = build_aliases(&title, &file_name);
            notes.insert(
                rel_path.clone(),
                NoteMeta {
                    path: rel_path.clone(),
                    title,
                    aliases,
                },
            );
            sections.extend(split_sections(&rel_path, &lines));
        }

        info!(
            notes = notes.len(),
            sections = sections.len(),
            root = %root.display(),
            "vault index built"
        );
        Self {
            root: Some(root.to_path_buf()),
            sections,
            notes,
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn notes(&self) -> impl Iterator<Item = &NoteMeta> {
        self.notes.values()
    }

    pub fn note(&self, path: &str) -> Option<&NoteMeta> {
        self.notes.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.notes.is_empty()
    }

    /// Top `top_k` sections with a strictly positive score for `query`.
    /// Score per section: token counts in the body, plus weighted counts in
    /// heading and path, plus an alias boost when the owning note is named
    /// by the query, plus a whole-phrase bonus.
    pub fn find_sections(&self, query: &str, top_k: usize) -> Vec<Section> {
        let query_lower = query.to_lowercase();
        let tokens = tokenize(&query_lower);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<Section> = Vec::new();
        for section in &self.sections {
            let alias_boost = match self.notes.get(&section.path) {
                Some(meta) if alias_in_query(meta, &query_lower) => ALIAS_BOOST,
                _ => 0.0,
            };
            let score = alias_boost + score_section(section, &tokens, &query_lower);
            if score > 0.0 {
                let mut hit = section.clone();
                hit.score = score;
                results.push(hit);
            }
        }
        sort_by_score(&mut results);
        results.truncate(top_k);
        results
    }

    /// Paths of every note with an alias that occurs as a literal substring
    /// of the lowercased query. The direction is alias-in-query, so short or
    /// generic aliases can over-match; callers treat this as a fast path,
    /// not an oracle.
    pub fn find_paths_by_alias(&self, query: &str) -> Vec<String> {
        let query_lower = query.to_lowercase();
        self.notes
            .values()
            .filter(|meta| alias_in_query(meta, &query_lower))
            .map(|meta| meta.path.clone())
            .collect()
    }

    /// All sections belonging to any of `paths`, in original index order.
    pub fn sections_for_paths(&self, paths: &[String]) -> Vec<Section> {
        let wanted: HashSet<&str> = paths.iter().map(String::as_str).collect();
        self.sections
            .iter()
            .filter(|section| wanted.contains(section.path.as_str()))
            .cloned()
            .collect()
    }

    /// Read one note by vault-relative path, truncated to `max_chars`.
    /// Traversal outside the root is rejected before touching the
    /// filesystem.
    pub fn open_note(&self, path: &str, max_chars: usize) -> Result<String> {
        let root = self.root.as_deref().ok_or(VaultError::RootUnset)?;
        let rel = Path::new(path);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(VaultError::PathTraversal(rel.to_path_buf()));
        }
        let target = root.join(rel);
        if !target.is_file() {
            return Err(VaultError::NoteNotFound(rel.to_path_buf()));
        }
        let content = read_lossy(&target);
        let (clipped, cut) = clip_chars(&content, max_chars);
        if cut {
            Ok(format!("{clipped}\n...\n"))
        } else {
            Ok(content)
        }
    }
}

fn alias_in_query(meta: &NoteMeta, query_lower: &str) -> bool {
    meta.aliases.iter().any(|alias| query_lower.contains(alias))
}

fn read_lossy(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            debug!(path = %path.display(), %err, "unreadable file treated as empty");
            String::new()
        }
    }
}

fn score_section(section: &Section, tokens: &[String], query_lower: &str) -> f64 {
    let text_lower = section.text.to_lowercase();
    let heading_lower = section.heading.to_lowercase();
    let path_lower = section.path.to_lowercase();
    let mut score = 0.0;
    for token in tokens {
        score += count_occurrences(&text_lower, token) as f64;
        score += HEADING_WEIGHT * count_occurrences(&heading_lower, token) as f64;
        score += PATH_WEIGHT * count_occurrences(&path_lower, token) as f64;
    }
    if text_lower.contains(query_lower) {
        score += PHRASE_BONUS;
    }
    score
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

fn sort_by_score(sections: &mut [Section]) {
    sections.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Re-rank an already-selected slice of sections against `query` without
/// alias boosts. Used when alias matching has pinned the candidate notes and
/// only intra-note ordering is needed.
pub fn rank_sections(sections: &[Section], query: &str, top_k: usize) -> Vec<Section> {
    let query_lower = query.to_lowercase();
    let tokens = tokenize(&query_lower);
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<Section> = sections
        .iter()
        .filter_map(|section| {
            let score = score_section(section, &tokens, &query_lower);
            if score > 0.0 {
                let mut hit = section.clone();
                hit.score = score;
                Some(hit)
            } else {
                None
            }
        })
        .collect();
    sort_by_score(&mut scored);
    scored.truncate(top_k);
    scored
}

/// Swappable handle around the current index snapshot. Readers clone the
/// inner `Arc`; a rebuild constructs a whole new index and swaps it in, so
/// in-flight queries keep the snapshot they started with.
pub struct IndexHandle {
    root: Option<PathBuf>,
    current: RwLock<Arc<VaultIndex>>,
}

impl IndexHandle {
    /// A handle whose first snapshot is empty; the index is built on first
    /// [`IndexHandle::ensure_built`] call.
    pub fn deferred(root: Option<PathBuf>) -> Self {
        Self {
            current: RwLock::new(Arc::new(VaultIndex::empty(root.clone()))),
            root,
        }
    }

    /// A handle that builds eagerly when a root is configured.
    pub fn eager(root: Option<PathBuf>) -> Self {
        let handle = Self::deferred(root);
        if handle.root.is_some() {
            handle.rebuild();
        }
        handle
    }

    pub fn snapshot(&self) -> Arc<VaultIndex> {
        self.current.read().clone()
    }

    /// Build a fresh index from the configured root and swap it in.
    pub fn rebuild(&self) -> Arc<VaultIndex> {
        let fresh = Arc::new(VaultIndex::build(self.root.as_deref()));
        *self.current.write() = fresh.clone();
        fresh
    }

    /// Current snapshot, building first if nothing has been indexed yet and
    /// a root is configured.
    pub fn ensure_built(&self) -> Arc<VaultIndex> {
        let current = self.snapshot();
        if current.is_empty() && self.root.is_some() {
            return self.rebuild();
        }
        current
    }
}
