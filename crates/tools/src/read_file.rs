//! Read file tool — shadow read of one project file.

use async_trait::async_trait;
use quill_core::error::ToolError;
use quill_core::files::normalize_path;
use quill_core::tool::{Tool, ToolContext, ToolExecutionResult, ToolKind};

use crate::args;
use crate::workspace::ShadowView;

pub struct ReadFileTool;

impl ReadFileTool {
    async fn run(
        &self,
        arguments: &serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<ToolExecutionResult, ToolError> {
        args::ensure_decoded(arguments)?;
        let path = normalize_path(args::required_str(arguments, "path")?)?;
        let view = ShadowView::new(ctx.files, ctx.pending);
        let content = view.read(&path).await?;
        if view.has_pending(&path) {
            ctx.logger.log(format!("{path}: reading unapproved version"));
        }
        ctx.logger.log(format!("read {} bytes", content.len()));
        Ok(ToolExecutionResult::Executed(content))
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the full contents of a project file. Unapproved changes are included."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Project-relative path of the file"
                }
            },
            "required": ["path"]
        })
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Read
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
