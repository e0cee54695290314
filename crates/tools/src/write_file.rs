//! Write file tool — proposes creating or overwriting a file.
//!
//! Nothing is written here. The tool returns a [`PendingChange`] that the
//! user approves or rejects later; until then, reads see the new content.

use async_trait::async_trait;
use quill_core::error::{FileError, ToolError};
use quill_core::files::normalize_path;
use quill_core::session::PendingChange;
use quill_core::tool::{Tool, ToolContext, ToolExecutionResult, ToolKind};

use crate::args;
use crate::workspace::ShadowView;

pub struct WriteFileTool;

impl WriteFileTool {
    async fn run(
        &self,
        arguments: &serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<ToolExecutionResult, ToolError> {
        args::ensure_decoded(arguments)?;
        args::require_thinking(arguments)?;
        let path = normalize_path(args::required_str(arguments, "path")?)?;
        let content = args::required_str(arguments, "content")?;

        if ctx.files.is_protected(&path) {
            return Err(FileError::Protected(path).into());
        }

        let view = ShadowView::new(ctx.files, ctx.pending);
        let current = match view.read(&path).await {
            Ok(current) => Some(current),
            Err(FileError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        if current.as_deref() == Some(content) {
            ctx.logger.log(format!("{path}: content unchanged"));
            return Ok(ToolExecutionResult::Executed(format!(
                "{path} already has this content; nothing to change"
            )));
        }

        let original = view.committed(&path).await?;
        let description = match current {
            Some(_) => format!("Overwrite {path}"),
            None => format!("Create {path}"),
        };
        ctx.logger.log(format!("{description} ({} bytes)", content.len()));

        Ok(ToolExecutionResult::ApprovalRequired(PendingChange::new(
            self.name(),
            arguments.clone(),
            path,
            original,
            Some(content.to_string()),
            description,
        )))
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create a file or replace its whole content. The change waits for user \
         approval; later reads already see it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "thinking": args::thinking_property(),
                "path": {
                    "type": "string",
                    "description": "Project-relative path of the file"
                },
                "content": {
                    "type": "string",
                    "description": "The complete new content"
                }
            },
            "required": ["thinking", "path", "content"]
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
