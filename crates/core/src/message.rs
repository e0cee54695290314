//! Message domain types.
//!
//! A message body is a tagged union so that illegal shapes (a user message
//! carrying tool calls, a tool response without a call id) cannot be built.
//! Conversation order is insertion order and is never rearranged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error_record::ErrorRecord;

/// The role a message plays on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The LLM
    Model,
    /// Engine-authored input: tool responses, approval results, notices
    System,
}

/// What kind of engine-authored notice a `System` message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemKind {
    /// The user approved or rejected a pending change.
    ApprovalResult,
    /// The turn was stopped by the user.
    Stopped,
    /// The turn hit the iteration ceiling.
    IterationLimit,
    /// A terminal error. The record lives in the message metadata.
    Error,
    /// Anything else worth showing.
    Notice,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned or synthesized id. Never regenerated once set.
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON object
    #[serde(default)]
    pub args: serde_json::Value,
}

impl ToolCallRequest {
    /// Create a request with a freshly synthesized call id.
    pub fn new(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            id: synthesize_call_id(),
            name: name.into(),
            args,
        }
    }

    /// The `thinking` rationale the model attached, if any.
    pub fn thinking(&self) -> Option<&str> {
        self.args
            .get("thinking")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Generate a call id in the provider's `call_…` style.
pub fn synthesize_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// How a tool invocation resolved, as recorded in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Executed,
    ApprovalRequired,
    Error,
}

/// The recorded answer to one `ToolCallRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Id of the call this answers
    pub call_id: String,

    /// Name of the tool that was called
    pub name: String,

    pub status: ResponseStatus,

    /// Text the model sees
    pub output: String,

    /// Original error text when `output` was rewritten by the anti-loop guard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_error: Option<String>,
}

/// The content of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    /// Plain user input
    User { text: String },

    /// A model turn: optional text plus any tool calls it requested
    Model {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },

    /// Results for the tool calls of the preceding model turn
    ToolResponses { responses: Vec<ToolResponse> },

    /// Engine notice (approval result, stop, error, ...)
    System { kind: SystemKind, text: String },
}

/// Free-form bookkeeping attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Raw debug payload (response metadata, request snapshot, raw errors)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<serde_json::Value>,

    /// Classified error, for `SystemKind::Error` messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,

    /// Loop iteration that produced this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_count: Option<u32>,

    /// Non-fatal warning (truncated or empty response)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    pub body: MessageBody,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    fn with_body(body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            body,
            timestamp: Utc::now(),
            metadata: MessageMetadata::default(),
        }
    }

    /// Create a new user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_body(MessageBody::User { text: text.into() })
    }

    /// Create a model message. Empty text is normalized to `None`.
    pub fn model(text: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        let text = text.filter(|t| !t.trim().is_empty());
        Self::with_body(MessageBody::Model { text, tool_calls })
    }

    /// Create a text-only model message.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::model(Some(text.into()), Vec::new())
    }

    /// Create a tool-response message.
    pub fn tool_responses(responses: Vec<ToolResponse>) -> Self {
        Self::with_body(MessageBody::ToolResponses { responses })
    }

    /// Create an engine notice.
    pub fn system(kind: SystemKind, text: impl Into<String>) -> Self {
        Self::with_body(MessageBody::System {
            kind,
            text: text.into(),
        })
    }

    pub fn role(&self) -> Role {
        match self.body {
            MessageBody::User { .. } => Role::User,
            MessageBody::Model { .. } => Role::Model,
            MessageBody::ToolResponses { .. } | MessageBody::System { .. } => Role::System,
        }
    }

    /// Tool calls carried by a model message (empty for every other kind).
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match &self.body {
            MessageBody::Model { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }

    /// Tool responses carried by this message (empty for every other kind).
    pub fn responses(&self) -> &[ToolResponse] {
        match &self.body {
            MessageBody::ToolResponses { responses } => responses,
            _ => &[],
        }
    }

    pub fn is_tool_responses(&self) -> bool {
        matches!(self.body, MessageBody::ToolResponses { .. })
    }

    pub fn is_system_kind(&self, wanted: SystemKind) -> bool {
        matches!(&self.body, MessageBody::System { kind, .. } if *kind == wanted)
    }

    /// Human-readable text for the UI.
    pub fn display_text(&self) -> String {
        match &self.body {
            MessageBody::User { text } => text.clone(),
            MessageBody::Model { text, tool_calls } => {
                let mut out = text.clone().unwrap_or_default();
                for call in tool_calls {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(&format!("→ {}", call.name));
                }
                out
            }
            MessageBody::ToolResponses { responses } => responses
                .iter()
                .map(|r| format!("[{}] {}", r.name, r.output))
                .collect::<Vec<_>>()
                .join("\n"),
            MessageBody::System { text, .. } => text.clone(),
        }
    }
}
