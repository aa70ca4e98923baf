//! JSON-file-backed conversation sessions.
//!
//! Sessions and their last-used citation lists are keyed by
//! `"<user_id>:<channel_id>"`. The whole store is read once at startup and
//! rewritten on every update; a missing or corrupt file simply starts
//! empty. Access is read-modify-write under one coarse lock, which is
//! enough for one active conversation per key.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use dory_core::{Result, Turn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Persisted {
    #[serde(default)]
    sessions: HashMap<String, Vec<Turn>>,
    #[serde(default)]
    sources: HashMap<String, Vec<String>>,
}

pub struct SessionStore {
    path: PathBuf,
    max_turns: usize,
    inner: Mutex<Persisted>,
}

impl SessionStore {
    pub fn open(path: impl Into<PathBuf>, max_turns: usize) -> Self {
        let path = path.into();
        let inner = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "session file unreadable, starting empty");
                Persisted::default()
            }),
            Err(_) => Persisted::default(),
        };
        Self {
            path,
            max_turns,
            inner: Mutex::new(inner),
        }
    }

    fn key(user_id: &str, channel_id: &str) -> String {
        format!("{user_id}:{channel_id}")
    }

    pub fn history(&self, user_id: &str, channel_id: &str) -> Vec<Turn> {
        self.inner
            .lock()
            .sessions
            .get(&Self::key(user_id, channel_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the conversation for a key, keeping only the most recent
    /// `max_turns` turns, and persist.
    pub fn update_history(
        &self,
        user_id: &str,
        channel_id: &str,
        mut turns: Vec<Turn>,
    ) -> Result<()> {
        if turns.len() > self.max_turns {
            turns.drain(..turns.len() - self.max_turns);
        }
        let mut inner = self.inner.lock();
        inner
            .sessions
            .insert(Self::key(user_id, channel_id), turns);
        save(&self.path, &inner)
    }

    /// Append a user/assistant exchange to the conversation and persist.
    pub fn record_exchange(
        &self,
        user_id: &str,
        channel_id: &str,
        user_text: &str,
        reply: &str,
    ) -> Result<()> {
        let mut turns = self.history(user_id, channel_id);
        turns.push(Turn::user(user_text));
        turns.push(Turn::assistant(reply));
        self.update_history(user_id, channel_id, turns)
    }

    pub fn sources(&self, user_id: &str, channel_id: &str) -> Vec<String> {
        self.inner
            .lock()
            .sources
            .get(&Self::key(user_id, channel_id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_sources(
        &self,
        user_id: &str,
        channel_id: &str,
        sources: Vec<String>,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.sources.insert(Self::key(user_id, channel_id), sources);
        save(&self.path, &inner)
    }
}

fn save(path: &Path, data: &Persisted) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_vec_pretty(data)?)?;
    Ok(())
}
