//! Conversation sessions and the pending-change record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;

/// Unique identifier for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    #[default]
    Pending,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub status: TodoStatus,
}

/// A conversation between the user and the agent, scoped to one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: SessionId,

    /// The project this conversation belongs to
    pub project_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Ordered messages
    pub messages: Vec<Message>,

    #[serde(default)]
    pub todos: Vec<TodoItem>,

    pub created_at: DateTime<Utc>,

    /// Last mutation
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    /// Create a new empty session for a project.
    pub fn new(project_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            project_id: project_id.into(),
            title: None,
            messages: Vec::new(),
            todos: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message to the conversation.
    pub fn push(&mut self, message: Message) {
        self.touch();
        self.messages.push(message);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A write proposed by a tool and waiting for the user's decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    pub id: String,

    /// Tool that proposed it
    pub tool_name: String,

    /// Arguments the tool was called with
    pub args: serde_json::Value,

    /// Target file path
    pub file_path: String,

    /// Committed content at proposal time. `None` means a new file.
    pub original_content: Option<String>,

    /// Proposed content. `None` means deletion.
    pub new_content: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// Human-readable summary for the approval UI
    pub description: String,
}

impl PendingChange {
    pub fn new(
        tool_name: impl Into<String>,
        args: serde_json::Value,
        file_path: impl Into<String>,
        original_content: Option<String>,
        new_content: Option<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tool_name: tool_name.into(),
            args,
            file_path: file_path.into(),
            original_content,
            new_content,
            timestamp: Utc::now(),
            description: description.into(),
        }
    }

    pub fn is_creation(&self) -> bool {
        self.original_content.is_none() && self.new_content.is_some()
    }

    pub fn is_deletion(&self) -> bool {
        self.new_content.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_tracks_updates() {
        let mut session = ConversationSession::new("novel");
        let created = session.updated_at;
        session.push(Message::user("First message"));
        assert_eq!(session.messages.len(), 1);
        assert!(session.updated_at >= created);
    }

    #[test]
    fn pending_change_shape() {
        let create = PendingChange::new("write_file", serde_json::json!({}), "a.md", None, Some("x".into()), "Create a.md");
        assert!(create.is_creation());
        assert!(!create.is_deletion());

        let delete = PendingChange::new("delete_file", serde_json::json!({}), "a.md", Some("x".into()), None, "Delete a.md");
        assert!(delete.is_deletion());
    }

    #[test]
    fn todo_status_defaults_to_pending() {
        let item: TodoItem = serde_json::from_str(r#"{"id":"1","text":"outline"}"#).unwrap();
        assert_eq!(item.status, TodoStatus::Pending);
    }
}
