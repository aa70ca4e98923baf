//! Runtime settings: built-in defaults, overlaid by an optional TOML file,
//! overridden by environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use dory_llm::{GeneratorBackend, GeneratorConfig, DEFAULT_OPENAI_MODEL};

const DEFAULT_CONFIG_FILE: &str = "dory.toml";
const DEFAULT_LOCAL_BIN: &str = "codex";
const DEFAULT_MAX_SNIPPETS: usize = 10;
const DEFAULT_SESSION_MAX_TURNS: usize = 16;
const DEFAULT_TIMEOUT_S: u64 = 60;

#[derive(Debug, Clone)]
pub struct Settings {
    pub vault_path: Option<PathBuf>,
    pub backend: GeneratorBackend,
    pub local_bin: String,
    pub local_args: Vec<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub max_snippets: usize,
    pub session_path: PathBuf,
    pub session_max_turns: usize,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_path: None,
            backend: GeneratorBackend::Local,
            local_bin: DEFAULT_LOCAL_BIN.to_string(),
            local_args: Vec::new(),
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            max_snippets: DEFAULT_MAX_SNIPPETS,
            session_path: PathBuf::from("data/sessions.json"),
            session_max_turns: DEFAULT_SESSION_MAX_TURNS,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_S),
        }
    }
}

/// Optional `dory.toml` overlay; every field may be omitted.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    vault_path: Option<PathBuf>,
    backend: Option<String>,
    local_bin: Option<String>,
    local_args: Option<String>,
    openai_model: Option<String>,
    max_snippets: Option<usize>,
    session_path: Option<PathBuf>,
    session_max_turns: Option<usize>,
    timeout_s: Option<u64>,
}

impl Settings {
    /// Defaults, overlaid by the config file named in `DORY_CONFIG` (or
    /// `dory.toml` when present), overridden by `DORY_*` environment
    /// variables. Fails on an unparseable file or an unknown backend name.
    pub fn load() -> Result<Self> {
        let mut settings = Self::default();

        let config_path = env::var("DORY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        if config_path.is_file() {
            let raw = std::fs::read_to_string(&config_path)?;
            let file: FileConfig = toml::from_str(&raw)
                .map_err(|err| anyhow!("invalid config {}: {err}", config_path.display()))?;
            settings.apply_file(file)?;
        }
        settings.apply_env()?;
        Ok(settings)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(path) = file.vault_path {
            self.vault_path = Some(path);
        }
        if let Some(name) = file.backend {
            self.backend = parse_backend(&name)?;
        }
        if let Some(bin) = file.local_bin {
            self.local_bin = bin;
        }
        if let Some(args) = file.local_args {
            self.local_args = split_args(&args);
        }
        if let Some(model) = file.openai_model {
            self.openai_model = model;
        }
        if let Some(value) = file.max_snippets {
            self.max_snippets = value;
        }
        if let Some(path) = file.session_path {
            self.session_path = path;
        }
        if let Some(value) = file.session_max_turns {
            self.session_max_turns = value;
        }
        if let Some(secs) = file.timeout_s {
            self.request_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = env_nonempty("DORY_VAULT") {
            self.vault_path = Some(PathBuf::from(path));
        }
        if let Some(name) = env_nonempty("DORY_BACKEND") {
            self.backend = parse_backend(&name)?;
        }
        if let Some(bin) = env_nonempty("DORY_LOCAL_BIN") {
            self.local_bin = bin;
        }
        if let Some(args) = env_nonempty("DORY_LOCAL_ARGS") {
            self.local_args = split_args(&args);
        }
        if let Some(key) = env_nonempty("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(model) = env_nonempty("DORY_OPENAI_MODEL") {
            self.openai_model = model;
        }
        if let Some(value) = env_nonempty("DORY_MAX_SNIPPETS") {
            self.max_snippets = value
                .parse()
                .map_err(|_| anyhow!("DORY_MAX_SNIPPETS must be a number"))?;
        }
        if let Some(path) = env_nonempty("DORY_SESSION_PATH") {
            self.session_path = PathBuf::from(path);
        }
        if let Some(value) = env_nonempty("DORY_SESSION_MAX_TURNS") {
            self.session_max_turns = value
                .parse()
                .map_err(|_| anyhow!("DORY_SESSION_MAX_TURNS must be a number"))?;
        }
        if let Some(value) = env_nonempty("DORY_TIMEOUT_S") {
            let secs: u64 = value
                .parse()
                .map_err(|_| anyhow!("DORY_TIMEOUT_S must be a number"))?;
            self.request_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            backend: self.backend,
            local_bin: self.local_bin.clone(),
            local_args: self.local_args.clone(),
            openai_api_key: self.openai_api_key.clone(),
            openai_model: self.openai_model.clone(),
            timeout: self.request_timeout,
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_backend(name: &str) -> Result<GeneratorBackend> {
    GeneratorBackend::from_str(name).ok_or_else(|| anyhow!("unknown generator backend {name}"))
}

fn split_args(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
