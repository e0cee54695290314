//! Built-in tool implementations for Quill.
//!
//! Tools give the agent its hands on the project: list, read and search
//! files, propose edits that wait for approval, and keep a todo list.
//! Every read goes through the [`workspace::ShadowView`], so proposed
//! content is visible before it is approved.

pub mod args;
pub mod delete_file;
pub mod list_files;
pub mod patch_file;
pub mod read_file;
pub mod rename_file;
pub mod search_files;
pub mod thinking;
pub mod update_todos;
pub mod workspace;
pub mod write_file;

#[cfg(test)]
pub(crate) mod testing;

use quill_core::tool::ToolRegistry;

pub use workspace::{ShadowEntry, ShadowState, ShadowView};

/// Name of the reasoning tool registered by [`default_registry`].
pub const REASONING_TOOL: &str = "thinking";

/// Create a registry with every built-in tool, in declaration order.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(thinking::ThinkingTool));
    registry.register(Box::new(list_files::ListFilesTool));
    registry.register(Box::new(read_file::ReadFileTool));
    registry.register(Box::new(search_files::SearchFilesTool));
    registry.register(Box::new(write_file::WriteFileTool));
    registry.register(Box::new(patch_file::PatchFileTool));
    registry.register(Box::new(delete_file::DeleteFileTool));
    registry.register(Box::new(rename_file::RenameFileTool));
    registry.register(Box::new(update_todos::UpdateTodosTool));
    tracing::debug!(tools = registry.len(), "Built-in tool registry ready");
    registry
}
