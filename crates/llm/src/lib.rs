//! Answer-generator collaborators.
//!
//! The query pipeline hands a system prompt, the conversation so far and the
//! supporting snippets to an [`AnswerGenerator`] and gets text back. Two
//! backends are provided: a local subprocess that reads a flattened prompt
//! on stdin, and an OpenAI-compatible chat completion endpoint. Failures are
//! typed ([`GeneratorError`]) so callers branch on the category instead of
//! pattern-matching reply text.

use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Runtime;
use tokio::time::timeout;
use tracing::debug;

use dory_core::{Snippet, Turn};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const TEMPERATURE: f64 = 0.2;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("local answer binary not found: {0}")]
    MissingBinary(String),
    #[error("answer generation timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    #[error("local exec failed: {0}")]
    Exec(String),
    #[error("api error: status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0} is required for the openai backend")]
    MissingCredential(&'static str),
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type GeneratorResult = Result<String, GeneratorError>;

/// The collaborator boundary the pipeline calls. Implementations must honor
/// their configured timeout; the pipeline never cancels from outside.
pub trait AnswerGenerator: Send + Sync {
    fn generate(
        &self,
        system_prompt: &str,
        conversation: &[Turn],
        snippets: &[Snippet],
    ) -> GeneratorResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorBackend {
    Local,
    OpenAi,
}

impl GeneratorBackend {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "local" => Some(Self::Local),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::OpenAi => "openai",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub backend: GeneratorBackend,
    pub local_bin: String,
    pub local_args: Vec<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: GeneratorBackend::Local,
            local_bin: "codex".to_string(),
            local_args: Vec::new(),
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

enum BackendConfig {
    Local {
        bin: String,
        args: Vec<String>,
    },
    OpenAi {
        api_key: String,
        model: String,
        http: reqwest::Client,
    },
}

pub struct GeneratorClient {
    backend: BackendConfig,
    timeout: Duration,
}

impl GeneratorClient {
    /// Validates backend requirements up front; selecting the OpenAI backend
    /// without a key fails here, before any request is accepted.
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let backend = match config.backend {
            GeneratorBackend::Local => BackendConfig::Local {
                bin: config.local_bin,
                args: config.local_args,
            },
            GeneratorBackend::OpenAi => {
                let api_key = config
                    .openai_api_key
                    .filter(|key| !key.trim().is_empty())
                    .ok_or(GeneratorError::MissingCredential("OPENAI_API_KEY"))?;
                let http = reqwest::Client::builder()
                    .timeout(config.timeout)
                    .build()
                    .map_err(GeneratorError::Http)?;
                BackendConfig::OpenAi {
                    api_key,
                    model: config.openai_model,
                    http,
                }
            }
        };
        Ok(Self {
            backend,
            timeout: config.timeout,
        })
    }

    async fn run_local(
        &self,
        bin: &str,
        args: &[String],
        prompt: &str,
    ) -> GeneratorResult {
        let mut command = Command::new(bin);
        command
            .arg("exec")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(GeneratorError::MissingBinary(bin.to_string()));
            }
            Err(err) => return Err(GeneratorError::Exec(err.to_string())),
        };

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|err| GeneratorError::Exec(err.to_string()))?;
        }

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|err| GeneratorError::Exec(err.to_string()))?,
            Err(_) => return Err(GeneratorError::TimedOut(self.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let detail = if stderr.is_empty() { stdout } else { stderr };
            return Err(GeneratorError::Exec(detail));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run_openai(
        &self,
        http: &reqwest::Client,
        api_key: &str,
        model: &str,
        system_prompt: &str,
        conversation: &[Turn],
        snippets: &[Snippet],
    ) -> GeneratorResult {
        let mut messages = vec![json!({"role": "system", "content": system_prompt})];
        for turn in conversation {
            messages.push(json!({"role": &turn.role, "content": &turn.content}));
        }
        if !snippets.is_empty() {
            messages.push(json!({
                "role": "system",
                "content": format!("Vault snippets:\n{}", format_snippets(snippets)),
            }));
        }
        let payload = json!({
            "model": model,
            "messages": messages,
            "temperature": TEMPERATURE,
        });

        let response = http
            .post(OPENAI_CHAT_URL)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| GeneratorError::Api {
                status: status.as_u16(),
                body: "missing choices in response".to_string(),
            })
    }
}

impl AnswerGenerator for GeneratorClient {
    fn generate(
        &self,
        system_prompt: &str,
        conversation: &[Turn],
        snippets: &[Snippet],
    ) -> GeneratorResult {
        let rt = Runtime::new().map_err(|err| GeneratorError::Runtime(err.to_string()))?;
        match &self.backend {
            BackendConfig::Local { bin, args } => {
                let prompt = format_prompt(system_prompt, conversation, snippets);
                debug!(bin = %bin, prompt_chars = prompt.len(), "invoking local generator");
                rt.block_on(self.run_local(bin, args, &prompt))
            }
            BackendConfig::OpenAi {
                api_key,
                model,
                http,
            } => rt.block_on(self.run_openai(
                http,
                api_key,
                model,
                system_prompt,
                conversation,
                snippets,
            )),
        }
    }
}

/// Numbered citation-plus-excerpt blocks, the shape both backends present
/// snippets in.
pub fn format_snippets(snippets: &[Snippet]) -> String {
    snippets
        .iter()
        .enumerate()
        .map(|(idx, snippet)| format!("[{}] {}\n{}", idx + 1, snippet.citation(), snippet.excerpt))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Flatten everything into the single prompt the local backend reads from
/// stdin.
pub fn format_prompt(system_prompt: &str, conversation: &[Turn], snippets: &[Snippet]) -> String {
    let mut lines = vec![
        "SYSTEM:".to_string(),
        system_prompt.trim().to_string(),
        String::new(),
        "CONVERSATION:".to_string(),
    ];
    for turn in conversation {
        let label = if turn.role == "user" { "User" } else { "Assistant" };
        lines.push(format!("{}: {}", label, turn.content));
    }
    if !snippets.is_empty() {
        lines.push(String::new());
        lines.push("VAULT SNIPPETS:".to_string());
        lines.push(format_snippets(snippets));
    }
    lines.push(String::new());
    lines.push("ASSISTANT:".to_string());
    lines.join("\n")
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet() -> Snippet {
        Snippet {
            path: "Pricing.md".to_string(),
            heading: "Pakker".to_string(),
            line_start: 2,
            line_end: 4,
            excerpt: "Basis — 499 kr.".to_string(),
            score: 999.0,
        }
    }

    #[test]
    fn formats_numbered_snippets() {
        let text = format_snippets(&[snippet()]);
        assert!(text.starts_with("[1] Pricing.md#Pakker (lines 2-4)\n"));
        assert!(text.contains("Basis — 499 kr."));
    }

    #[test]
    fn prompt_layout_has_all_blocks() {
        let conversation = vec![Turn::user("hvad koster basis?"), Turn::assistant("...")];
        let prompt = format_prompt("You are Dory.", &conversation, &[snippet()]);
        let expected_order = ["SYSTEM:", "CONVERSATION:", "User:", "Assistant:", "VAULT SNIPPETS:", "ASSISTANT:"];
        let mut last = 0;
        for marker in expected_order {
            let pos = prompt[last..].find(marker).expect(marker);
            last += pos;
        }
        assert!(prompt.ends_with("ASSISTANT:"));
    }

    #[test]
    fn prompt_without_snippets_omits_block() {
        let prompt = format_prompt("sys", &[Turn::user("hi")], &[]);
        assert!(!prompt.contains("VAULT SNIPPETS:"));
    }

    #[test]
    fn openai_backend_requires_key() {
        let config = GeneratorConfig {
            backend: GeneratorBackend::OpenAi,
            openai_api_key: None,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            GeneratorClient::new(config),
            Err(GeneratorError::MissingCredential("OPENAI_API_KEY"))
        ));
    }

    #[test]
    fn backend_names_roundtrip() {
        assert_eq!(GeneratorBackend::from_str("OpenAI"), Some(GeneratorBackend::OpenAi));
        assert_eq!(GeneratorBackend::from_str("local"), Some(GeneratorBackend::Local));
        assert_eq!(GeneratorBackend::from_str("other"), None);
    }
}
