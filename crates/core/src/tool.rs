//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what let the agent act on the project: read and search files,
//! propose edits, keep a todo list. Each tool is statically classified as
//! read, write or meta, which decides whether it is declared in a given
//! [`AgentMode`].

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::agent::AgentMode;
use crate::error::ToolError;
use crate::event::{EventBus, UiEvent};
use crate::files::FileStore;
use crate::message::ResponseStatus;
use crate::provider::ToolDefinition;
use crate::session::{PendingChange, SessionId, TodoItem};

/// Static classification of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Never changes anything
    Read,
    /// Changes project files or session state
    Write,
    /// Talks about the work rather than doing it (reasoning)
    Meta,
}

impl ToolKind {
    pub fn allowed_in(self, mode: AgentMode) -> bool {
        match mode {
            AgentMode::Edit => true,
            AgentMode::ReadOnly => self != ToolKind::Write,
        }
    }
}

/// The result of one tool invocation. Exactly one per call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolExecutionResult {
    Executed(String),
    ApprovalRequired(PendingChange),
    Error(String),
}

impl ToolExecutionResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn status(&self) -> ResponseStatus {
        match self {
            Self::Executed(_) => ResponseStatus::Executed,
            Self::ApprovalRequired(_) => ResponseStatus::ApprovalRequired,
            Self::Error(_) => ResponseStatus::Error,
        }
    }

    /// The text the model sees for this result.
    pub fn model_text(&self) -> String {
        match self {
            Self::Executed(text) => text.clone(),
            Self::ApprovalRequired(change) => format!(
                "Change proposed and waiting for user approval (id {}): {}. \
                 Later reads of {} will see the proposed content.",
                change.id, change.description, change.file_path
            ),
            Self::Error(message) => format!("Error: {message}"),
        }
    }
}

impl From<ToolError> for ToolExecutionResult {
    fn from(err: ToolError) -> Self {
        Self::Error(err.to_string())
    }
}

/// Streams progress lines from a running tool to the UI.
///
/// Bound to a single call id by the dispatcher.
#[derive(Debug, Clone)]
pub struct ToolLogger {
    session_id: SessionId,
    call_id: String,
    tool_name: String,
    bus: Option<EventBus>,
}

impl ToolLogger {
    pub fn new(
        session_id: SessionId,
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        bus: Option<EventBus>,
    ) -> Self {
        Self {
            session_id,
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            bus,
        }
    }

    /// A logger that only writes to `tracing`.
    pub fn detached(tool_name: impl Into<String>) -> Self {
        Self::new(SessionId::from("detached"), "", tool_name, None)
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(
            session_id = %self.session_id,
            call_id = %self.call_id,
            tool = %self.tool_name,
            "{line}"
        );
        if let Some(bus) = &self.bus {
            bus.publish(UiEvent::ToolLog {
                session_id: self.session_id.clone(),
                call_id: self.call_id.clone(),
                tool_name: self.tool_name.clone(),
                line,
                timestamp: Utc::now(),
            });
        }
    }
}

/// Everything a tool may touch while it runs.
pub struct ToolContext<'a> {
    /// Committed project files
    pub files: &'a dyn FileStore,

    /// Unapproved changes, oldest first. Reads go through these.
    pub pending: &'a [PendingChange],

    /// The session's todo list
    pub todos: &'a mut Vec<TodoItem>,

    pub mode: AgentMode,

    pub logger: ToolLogger,

    /// Cancellation for the running turn
    pub cancel: CancellationToken,
}

/// The core Tool trait.
///
/// Tools never return `Err`: every precondition failure is an
/// [`ToolExecutionResult::Error`] the model gets to see.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    fn kind(&self) -> ToolKind;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> ToolExecutionResult;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// An ordered registry of available tools.
///
/// The loop uses this to:
/// 1. Get the tool definitions declared for the current mode
/// 2. Look up and execute tools when the LLM requests them
///
/// Declaration order is registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name in
    /// place.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(i) => self.tools[i] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Tool definitions declared in `mode`.
    pub fn definitions(&self, mode: AgentMode) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .filter(|t| t.kind().allowed_in(mode))
            .map(|t| t.to_definition())
            .collect()
    }

    /// Resolve a tool for execution in `mode`.
    pub fn resolve(&self, name: &str, mode: AgentMode) -> Result<&dyn Tool, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        if !tool.kind().allowed_in(mode) {
            return Err(ToolError::NotAllowed {
                tool_name: name.to_string(),
                mode: mode.to_string(),
            });
        }
        Ok(tool)
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
