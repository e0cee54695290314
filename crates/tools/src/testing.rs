//! Shared fixture for tool tests.

use quill_core::agent::AgentMode;
use quill_core::session::{PendingChange, TodoItem};
use quill_core::tool::{ToolContext, ToolLogger};
use quill_store::InMemoryFileStore;
use tokio_util::sync::CancellationToken;

pub(crate) struct Fixture {
    pub files: InMemoryFileStore,
    pub pending: Vec<PendingChange>,
    pub todos: Vec<TodoItem>,
    pub mode: AgentMode,
}

impl Fixture {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: InMemoryFileStore::with_files(files.iter().copied()),
            pending: Vec::new(),
            todos: Vec::new(),
            mode: AgentMode::Edit,
        }
    }

    pub fn protect(mut self, paths: &[&str]) -> Self {
        self.files = self.files.protect(paths.iter().copied());
        self
    }

    pub fn ctx(&mut self) -> ToolContext<'_> {
        ToolContext {
            files: &self.files,
            pending: &self.pending,
            todos: &mut self.todos,
            mode: self.mode,
            logger: ToolLogger::detached("test"),
            cancel: CancellationToken::new(),
        }
    }
}
