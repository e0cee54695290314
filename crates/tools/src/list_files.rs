//! List files tool — a plain-text tree of the project.

use async_trait::async_trait;
use quill_core::tool::{Tool, ToolContext, ToolExecutionResult, ToolKind};
use std::collections::BTreeSet;

use crate::workspace::{ShadowEntry, ShadowState, ShadowView};

pub struct ListFilesTool;

/// Render entries as an indented tree. Directories are printed once, before
/// their first file.
pub fn render_tree(entries: &[ShadowEntry]) -> String {
    if entries.is_empty() {
        return "(project is empty)".into();
    }

    let mut out = String::new();
    let mut printed_dirs: BTreeSet<String> = BTreeSet::new();

    for entry in entries {
        let parts: Vec<&str> = entry.path.split('/').collect();
        let (file, dirs) = match parts.split_last() {
            Some((file, dirs)) => (*file, dirs),
            None => continue,
        };

        let mut prefix = String::new();
        for (depth, dir) in dirs.iter().enumerate() {
            prefix.push_str(dir);
            prefix.push('/');
            if printed_dirs.insert(prefix.clone()) {
                out.push_str(&"  ".repeat(depth));
                out.push_str(dir);
                out.push_str("/\n");
            }
        }

        out.push_str(&"  ".repeat(dirs.len()));
        out.push_str(file);
        match entry.state {
            ShadowState::PendingDelete => out.push_str(" [pending delete]"),
            state => {
                out.push_str(&format!(" ({} bytes)", entry.size));
                match state {
                    ShadowState::PendingCreate => out.push_str(" [pending new]"),
                    ShadowState::PendingEdit => out.push_str(" [pending edit]"),
                    _ => {}
                }
            }
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List every file in the project as a tree, including changes that are \
         still waiting for approval."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Read
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> ToolExecutionResult {
        let view = ShadowView::new(ctx.files, ctx.pending);
        match view.list().await {
            Ok(entries) => {
                ctx.logger.log(format!("{} files", entries.len()));
                ToolExecutionResult::Executed(render_tree(&entries))
            }
            Err(e) => ToolExecutionResult::error(e.to_string()),
        }
    }
}
