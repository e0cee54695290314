//! # Quill Core
//!
//! Domain types, traits, and error definitions for the Quill agent engine.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every boundary is defined as a trait here. Implementations live in their
//! respective crates:
//! - [`Provider`]: LLM backends (`quill-providers`)
//! - [`Tool`]: agent capabilities (`quill-tools`)
//! - [`FileStore`] and [`BlobStore`]: project files and persistence (`quill-store`)
//!
//! All crates depend inward on core.

pub mod agent;
pub mod error;
pub mod error_record;
pub mod event;
pub mod files;
pub mod message;
pub mod provider;
pub mod session;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentMode, GatePolicy, TurnOutcome};
pub use error::{Error, FileError, ProviderError, Result, StoreError, ToolError};
pub use error_record::{ErrorCategory, ErrorRecord, Severity};
pub use event::{EventBus, UiEvent};
pub use files::{FileEntry, FileStore, TextEdit};
pub use message::{
    Message, MessageBody, MessageMetadata, ResponseStatus, Role, SystemKind, ToolCallRequest,
    ToolResponse,
};
pub use provider::{
    Candidate, FinishReason, Provider, ProviderRequest, ProviderResponse, ResponseMetadata,
    ToolChoice, ToolDefinition, Usage,
};
pub use session::{ConversationSession, PendingChange, SessionId, TodoItem, TodoStatus};
pub use store::BlobStore;
pub use tool::{Tool, ToolContext, ToolExecutionResult, ToolKind, ToolLogger, ToolRegistry};
