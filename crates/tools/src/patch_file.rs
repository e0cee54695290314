//! Patch file tool — search/replace edits against the shadow content.

use async_trait::async_trait;
use quill_core::error::{FileError, ToolError};
use quill_core::files::{TextEdit, apply_edits, normalize_path};
use quill_core::session::PendingChange;
use quill_core::tool::{Tool, ToolContext, ToolExecutionResult, ToolKind};

use crate::args;
use crate::workspace::ShadowView;

pub struct PatchFileTool;

fn parse_edits(arguments: &serde_json::Value) -> Result<Vec<TextEdit>, ToolError> {
    let raw = arguments
        .get("edits")
        .cloned()
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'edits' argument".into()))?;
    serde_json::from_value(raw).map_err(|e| {
        ToolError::InvalidArguments(format!(
            "'edits' must be a list of {{search, replace}} objects: {e}"
        ))
    })
}

impl PatchFileTool {
    async fn run(
        &self,
        arguments: &serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<ToolExecutionResult, ToolError> {
        args::ensure_decoded(arguments)?;
        args::require_thinking(arguments)?;
        let path = normalize_path(args::required_str(arguments, "path")?)?;
        let edits = parse_edits(arguments)?;

        if ctx.files.is_protected(&path) {
            return Err(FileError::Protected(path).into());
        }

        let view = ShadowView::new(ctx.files, ctx.pending);
        let current = view.read(&path).await?;
        let patched = apply_edits(&path, &current, &edits)?;
        ctx.logger.log(format!("{path}: {} edit(s) applied", edits.len()));

        if patched == current {
            return Ok(ToolExecutionResult::Executed(format!(
                "Edits leave {path} unchanged; nothing to approve"
            )));
        }

        let original = view.committed(&path).await?;
        Ok(ToolExecutionResult::ApprovalRequired(PendingChange::new(
            self.name(),
            arguments.clone(),
            path.clone(),
            original,
            Some(patched),
            format!("Edit {path} ({} change(s))", edits.len()),
        )))
    }
}

#[async_trait]
impl Tool for PatchFileTool {
    fn name(&self) -> &str {
        "patch_file"
    }

    fn description(&self) -> &str {
        "Apply ordered search/replace edits to a file. Each search text must match \
         exactly once. The result waits for user approval."
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
                "edits": {
                    "type": "array",
                    "description": "Edits applied in order",
                    "items": {
                        "type": "object",
                        "properties": {
                            "search": {"type": "string"},
                            "replace": {"type": "string"}
                        },
                        "required": ["search", "replace"]
                    }
                }
            },
            "required": ["thinking", "path", "edits"]
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
