//! Delete file tool — proposes removing a file.

use async_trait::async_trait;
use quill_core::error::{FileError, ToolError};
use quill_core::files::normalize_path;
use quill_core::session::PendingChange;
use quill_core::tool::{Tool, ToolContext, ToolExecutionResult, ToolKind};

use crate::args;
use crate::workspace::ShadowView;

pub struct DeleteFileTool;

impl DeleteFileTool {
    async fn run(
        &self,
        arguments: &serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<ToolExecutionResult, ToolError> {
        args::ensure_decoded(arguments)?;
        args::require_thinking(arguments)?;
        let path = normalize_path(args::required_str(arguments, "path")?)?;

        if ctx.files.is_protected(&path) {
            return Err(FileError::Protected(path).into());
        }

        let view = ShadowView::new(ctx.files, ctx.pending);
        if !view.exists(&path).await? {
            return Err(FileError::NotFound(path).into());
        }
        let original = view.committed(&path).await?;
        ctx.logger.log(format!("{path}: deletion proposed"));

        Ok(ToolExecutionResult::ApprovalRequired(PendingChange::new(
            self.name(),
            arguments.clone(),
            path.clone(),
            original,
            None,
            format!("Delete {path}"),
        )))
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Delete a file. The deletion waits for user approval."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "thinking": args::thinking_property(),
                "path": {
                    "type": "string",
                    "description": "Project-relative path of the file"
                }
            },
            "required": ["thinking", "path"]
        })
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Write
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> ToolExecutionResult {
        self.run(&arguments, ctx)
            .await
            .unwrap_or_else(ToolExecutionResult::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn deletion_has_no_new_content() {
        let mut fx = Fixture::new(&[("old.md", "bye")]);
        let result = DeleteFileTool
            .execute(serde_json::json!({"thinking": "unused", "path": "old.md"}), &mut fx.ctx())
            .await;
        let ToolExecutionResult::ApprovalRequired(change) = result else {
            panic!("expected approval");
        };
        assert!(change.is_deletion());
        assert_eq!(change.original_content.as_deref(), Some("bye"));
        assert_eq!(change.description, "Delete old.md");
    }

    #[tokio::test]
    async fn already_pending_deletion_is_not_found() {
        let mut fx = Fixture::new(&[("old.md", "bye")]);
        fx.pending.push(PendingChange::new(
            "delete_file",
            serde_json::json!({}),
            "old.md",
            Some("bye".into()),
            None,
            "Delete old.md",
        ));
        let result = DeleteFileTool
            .execute(serde_json::json!({"thinking": "again", "path": "old.md"}), &mut fx.ctx())
            .await;
        assert!(matches!(result, ToolExecutionResult::Error(_)));
    }
}
