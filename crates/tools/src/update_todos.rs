//! Update todos tool — replaces the session's todo list.

use std::collections::HashSet;

use async_trait::async_trait;
use quill_core::error::ToolError;
use quill_core::session::{TodoItem, TodoStatus};
use quill_core::tool::{Tool, ToolContext, ToolExecutionResult, ToolKind};

use crate::args;

pub struct UpdateTodosTool;

fn parse_status(value: Option<&str>) -> TodoStatus {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("done" | "completed" | "complete") => TodoStatus::Done,
        _ => TodoStatus::Pending,
    }
}

fn parse_todos(arguments: &serde_json::Value) -> Result<Vec<TodoItem>, ToolError> {
    let items = arguments
        .get("todos")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'todos' array".into()))?;

    let explicit_id = |item: &serde_json::Value| {
        item.get("id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from)
    };
    let mut taken: HashSet<String> = items.iter().filter_map(explicit_id).collect();

    let mut todos = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let text = item
            .get("text")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ToolError::InvalidArguments(format!("todo {} has no 'text'", i + 1))
            })?;
        let id = explicit_id(item).unwrap_or_else(|| {
            // skip numbers already used as explicit ids
            let mut n = i + 1;
            while taken.contains(&format!("todo-{n}")) {
                n += 1;
            }
            let id = format!("todo-{n}");
            taken.insert(id.clone());
            id
        });
        todos.push(TodoItem {
            id,
            text: text.to_string(),
            status: parse_status(item.get("status").and_then(|v| v.as_str())),
        });
    }
    Ok(todos)
}

impl UpdateTodosTool {
    fn run(
        &self,
        arguments: &serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<ToolExecutionResult, ToolError> {
        args::ensure_decoded(arguments)?;
        let todos = parse_todos(arguments)?;
        let done = todos
            .iter()
            .filter(|t| t.status == TodoStatus::Done)
            .count();
        let summary = format!("Todo list updated: {} item(s), {done} done", todos.len());
        ctx.logger.log(summary.clone());
        *ctx.todos = todos;
        Ok(ToolExecutionResult::Executed(summary))
    }
}

#[async_trait]
impl Tool for UpdateTodosTool {
    fn name(&self) -> &str {
        "update_todos"
    }

    fn description(&self) -> &str {
        "Replace the todo list for this conversation. Send the complete list each time."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string"},
                            "text": {"type": "string"},
                            "status": {"type": "string", "enum": ["pending", "done"]}
                        },
                        "required": ["text"]
                    }
                }
            },
            "required": ["todos"]
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
            .unwrap_or_else(ToolExecutionResult::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn replaces_the_list_and_assigns_ids() {
        let mut fx = Fixture::new(&[]);
        fx.todos.push(TodoItem {
            id: "old".into(),
            text: "stale".into(),
            status: TodoStatus::Pending,
        });
        let result = UpdateTodosTool
            .execute(
                serde_json::json!({"todos": [
                    {"text": "Outline act one", "status": "done"},
                    {"id": "keep", "text": "Draft chapter 2"}
                ]}),
                &mut fx.ctx(),
            )
            .await;
        assert_eq!(
            result,
            ToolExecutionResult::Executed("Todo list updated: 2 item(s), 1 done".into())
        );
        assert_eq!(fx.todos.len(), 2);
        assert_eq!(fx.todos[0].id, "todo-1");
        assert_eq!(fx.todos[0].status, TodoStatus::Done);
        assert_eq!(fx.todos[1].id, "keep");
        assert_eq!(fx.todos[1].status, TodoStatus::Pending);
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let mut fx = Fixture::new(&[]);
        let result = UpdateTodosTool
            .execute(serde_json::json!({"todos": [{"text": " "}]}), &mut fx.ctx())
            .await;
        assert!(matches!(result, ToolExecutionResult::Error(_)));
        assert!(fx.todos.is_empty());
    }

    #[tokio::test]
    async fn generated_ids_skip_explicit_ones() {
        let mut fx = Fixture::new(&[]);
        UpdateTodosTool
            .execute(
                serde_json::json!({"todos": [
                    {"id": "todo-2", "text": "Name the villain"},
                    {"text": "Fix the timeline"},
                    {"text": "Trim the prologue"}
                ]}),
                &mut fx.ctx(),
            )
            .await;
        let ids: Vec<&str> = fx.todos.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["todo-2", "todo-3", "todo-4"]);
    }
}
