//! System prompt construction.
//!
//! The system instruction is rebuilt on every iteration so the model always
//! sees the current project tree, including unapproved changes, and the
//! current todo list.

use async_trait::async_trait;
use quill_core::agent::AgentMode;
use quill_core::files::FileStore;
use quill_core::session::{PendingChange, TodoItem, TodoStatus};
use quill_tools::ShadowView;
use quill_tools::list_files::render_tree;

/// Everything a prompt builder may look at.
pub struct PromptContext<'a> {
    pub files: &'a dyn FileStore,
    pub pending: &'a [PendingChange],
    pub mode: AgentMode,
    pub todos: &'a [TodoItem],
    pub reasoning_tool: &'a str,
}

#[async_trait]
pub trait SystemPromptBuilder: Send + Sync {
    async fn build(&self, ctx: &PromptContext<'_>) -> String;
}

pub const DEFAULT_BASE_PROMPT: &str = "You are Quill, a writing assistant working inside \
the user's project. You help plan, draft and revise prose. Work with the tools: look at \
the files before changing them, keep edits focused, and explain what you changed when \
you are done. Changes to files wait for the user's approval; treat a proposed change as \
done and continue.";

/// Base prompt, mode, project tree and todos, in that order.
#[derive(Debug, Clone)]
pub struct DefaultPromptBuilder {
    base: String,
}

impl DefaultPromptBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl Default for DefaultPromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_PROMPT)
    }
}

fn mode_section(mode: AgentMode, reasoning_tool: &str) -> String {
    let rules = match mode {
        AgentMode::Edit => "You may read and change files.",
        AgentMode::ReadOnly => {
            "Read-only mode: you may read and search files but must not change them. \
             Suggest changes in your answer instead."
        }
    };
    format!(
        "## Mode: {mode}\n{rules}\nStart every new request by calling '{reasoning_tool}' \
         with your plan."
    )
}

fn todo_section(todos: &[TodoItem]) -> String {
    if todos.is_empty() {
        return "## Todo list\n(empty)".into();
    }
    let mut out = String::from("## Todo list");
    for todo in todos {
        let mark = match todo.status {
            TodoStatus::Done => "x",
            TodoStatus::Pending => " ",
        };
        out.push_str(&format!("\n- [{mark}] {} ({})", todo.text, todo.id));
    }
    out
}

#[async_trait]
impl SystemPromptBuilder for DefaultPromptBuilder {
    async fn build(&self, ctx: &PromptContext<'_>) -> String {
        let tree = match ShadowView::new(ctx.files, ctx.pending).list().await {
            Ok(entries) => render_tree(&entries),
            Err(e) => {
                tracing::warn!(error = %e, "File listing failed while building the prompt");
                format!("(file listing unavailable: {e})")
            }
        };

        [
            self.base.clone(),
            mode_section(ctx.mode, ctx.reasoning_tool),
            format!("## Project files\n{tree}"),
            todo_section(ctx.todos),
        ]
        .join("\n\n")
    }
}
