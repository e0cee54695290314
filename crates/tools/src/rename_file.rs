//! Rename file tool — moves a file immediately, without approval.

use async_trait::async_trait;
use quill_core::error::{FileError, ToolError};
use quill_core::files::normalize_path;
use quill_core::tool::{Tool, ToolContext, ToolExecutionResult, ToolKind};

use crate::args;
use crate::workspace::ShadowView;

pub struct RenameFileTool;

impl RenameFileTool {
    async fn run(
        &self,
        arguments: &serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<ToolExecutionResult, ToolError> {
        args::ensure_decoded(arguments)?;
        args::require_thinking(arguments)?;
        let from = normalize_path(args::required_str(arguments, "from")?)?;
        let to = normalize_path(args::required_str(arguments, "to")?)?;

        for path in [&from, &to] {
            if ctx.files.is_protected(path) {
                return Err(FileError::Protected(path.clone()).into());
            }
        }

        let view = ShadowView::new(ctx.files, ctx.pending);
        if view.has_pending(&from) {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().to_string(),
                reason: format!(
                    "{from} has unapproved changes; they must be approved or rejected before renaming"
                ),
            });
        }
        if !ctx.files.exists(&from).await? {
            return Err(FileError::NotFound(from).into());
        }
        if view.exists(&to).await? {
            return Err(FileError::AlreadyExists(to).into());
        }

        let message = ctx.files.rename(&from, &to).await?;
        ctx.logger.log(message.clone());
        Ok(ToolExecutionResult::Executed(message))
    }
}

#[async_trait]
impl Tool for RenameFileTool {
    fn name(&self) -> &str {
        "rename_file"
    }

    fn description(&self) -> &str {
        "Rename or move a file. Takes effect immediately."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "thinking": args::thinking_property(),
                "from": {
                    "type": "string",
                    "description": "Current path"
                },
                "to": {
                    "type": "string",
                    "description": "New path"
                }
            },
            "required": ["thinking", "from", "to"]
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
    use quill_core::files::FileStore;
    use quill_core::session::PendingChange;

    fn args(from: &str, to: &str) -> serde_json::Value {
        serde_json::json!({"thinking": "better name", "from": from, "to": to})
    }

    #[tokio::test]
    async fn renames_immediately() {
        let mut fx = Fixture::new(&[("draft.md", "text")]);
        let result = RenameFileTool.execute(args("draft.md", "ch1.md"), &mut fx.ctx()).await;
        assert!(matches!(result, ToolExecutionResult::Executed(_)));
        assert_eq!(fx.files.read("ch1.md").await.unwrap(), "text");
        assert!(!fx.files.exists("draft.md").await.unwrap());
    }

    #[tokio::test]
    async fn missing_source_is_an_error() {
        let mut fx = Fixture::new(&[]);
        let result = RenameFileTool.execute(args("nope.md", "ch1.md"), &mut fx.ctx()).await;
        assert!(matches!(result, ToolExecutionResult::Error(_)));
    }

    #[tokio::test]
    async fn existing_target_is_an_error() {
        let mut fx = Fixture::new(&[("a.md", "a"), ("b.md", "b")]);
        let result = RenameFileTool.execute(args("a.md", "b.md"), &mut fx.ctx()).await;
        assert!(matches!(result, ToolExecutionResult::Error(_)));
        assert_eq!(fx.files.read("b.md").await.unwrap(), "b");
    }

    #[tokio::test]
    async fn pending_target_counts_as_existing() {
        let mut fx = Fixture::new(&[("a.md", "a")]);
        fx.pending.push(PendingChange::new(
            "write_file",
            serde_json::json!({}),
            "b.md",
            None,
            Some("new".into()),
            "Create b.md",
        ));
        let result = RenameFileTool.execute(args("a.md", "b.md"), &mut fx.ctx()).await;
        assert!(matches!(result, ToolExecutionResult::Error(_)));
    }

    #[tokio::test]
    async fn source_with_pending_changes_is_an_error() {
        let mut fx = Fixture::new(&[("a.md", "a")]);
        fx.pending.push(PendingChange::new(
            "write_file",
            serde_json::json!({}),
            "a.md",
            Some("a".into()),
            Some("changed".into()),
            "Overwrite a.md",
        ));
        let result = RenameFileTool.execute(args("a.md", "c.md"), &mut fx.ctx()).await;
        let ToolExecutionResult::Error(message) = result else {
            panic!("expected error");
        };
        assert!(message.contains("unapproved"));
    }
}
