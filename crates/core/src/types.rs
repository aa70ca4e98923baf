use serde::{Deserialize, Serialize};

/// A citation-bearing excerpt. This is the only shape handed across the
/// boundary to the answer generator and back out to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub path: String,
    pub heading: String,
    pub line_start: usize,
    pub line_end: usize,
    pub excerpt: String,
    pub score: f64,
}

impl Snippet {
    /// Citation form used in `Sources:` blocks.
    pub fn citation(&self) -> String {
        format!(
            "{}#{} (lines {}-{})",
            self.path, self.heading, self.line_start, self.line_end
        )
    }
}

/// One conversation turn as stored in the session history and sent to the
/// answer generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}
