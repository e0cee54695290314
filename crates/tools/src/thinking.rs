//! Thinking tool — the model writes down its plan before acting.

use async_trait::async_trait;
use quill_core::tool::{Tool, ToolContext, ToolExecutionResult, ToolKind};

use crate::args;

pub struct ThinkingTool;

#[async_trait]
impl Tool for ThinkingTool {
    fn name(&self) -> &str {
        "thinking"
    }

    fn description(&self) -> &str {
        "Think through the request before acting: restate the goal, list the files \
         you need to look at, and plan the edits. Call this before any other tool."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "thought": {
                    "type": "string",
                    "description": "Your reasoning and plan"
                }
            },
            "required": ["thought"]
        })
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Meta
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> ToolExecutionResult {
        if let Err(e) = args::ensure_decoded(&arguments) {
            return e.into();
        }
        let Some(thought) = args::optional_str(&arguments, "thought").map(str::trim) else {
            return ToolExecutionResult::error("Missing 'thought' argument");
        };
        ctx.logger.log(format!("thought: {thought}"));
        ToolExecutionResult::Executed("Thought recorded. Continue with the plan.".into())
    }
}
