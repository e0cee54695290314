//! User-facing error records.
//!
//! An `ErrorRecord` is what the UI renders when a turn fails: a title, a short
//! explanation, a handful of suggestions, and a debug payload that is never
//! shown inline.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    Network,
    #[serde(rename = "API")]
    Api,
    RateLimit,
    Auth,
    Parse,
    Content,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Network => "Network",
            Self::Api => "API",
            Self::RateLimit => "RateLimit",
            Self::Auth => "Auth",
            Self::Parse => "Parse",
            Self::Content => "Content",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub category: ErrorCategory,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// One to four actionable suggestions
    pub suggestions: Vec<String>,
    pub recoverable: bool,
    /// Raw error, request/response snapshot
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub debug: serde_json::Value,
}

impl ErrorRecord {
    pub fn new(
        category: ErrorCategory,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            title: title.into(),
            message: message.into(),
            suggestions: Vec::new(),
            recoverable: true,
            debug: serde_json::Value::Null,
        }
    }

    /// Add suggestions. At most four are kept.
    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions
            .extend(suggestions.into_iter().map(Into::into));
        self.suggestions.truncate(4);
        self
    }

    pub fn recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    pub fn with_debug(mut self, debug: serde_json::Value) -> Self {
        self.debug = debug;
        self
    }

    /// Text for the terminal system message: title, explanation, suggestions.
    pub fn render(&self) -> String {
        let mut out = format!("{}\n{}", self.title, self.message);
        if !self.suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for s in &self.suggestions {
                out.push_str("\n- ");
                out.push_str(s);
            }
        }
        out
    }
}
