//! Search files tool — case-insensitive substring search across the project.

use async_trait::async_trait;
use quill_core::error::ToolError;
use quill_core::tool::{Tool, ToolContext, ToolExecutionResult, ToolKind};

use crate::args;
use crate::workspace::{ShadowState, ShadowView};

/// Matches reported per call.
const MAX_MATCHES: usize = 50;

pub struct SearchFilesTool;

impl SearchFilesTool {
    async fn run(
        &self,
        arguments: &serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<ToolExecutionResult, ToolError> {
        args::ensure_decoded(arguments)?;
        let query = args::required_str(arguments, "query")?.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("'query' must not be empty".into()));
        }
        let needle = query.to_lowercase();
        let prefix = args::optional_str(arguments, "path").map(|p| p.trim_start_matches("./"));

        let view = ShadowView::new(ctx.files, ctx.pending);
        let mut matches = Vec::new();
        let mut total = 0usize;

        for entry in view.list().await? {
            if entry.state == ShadowState::PendingDelete {
                continue;
            }
            if let Some(prefix) = prefix {
                if !entry.path.starts_with(prefix) {
                    continue;
                }
            }
            if ctx.cancel.is_cancelled() {
                break;
            }
            let content = view.read(&entry.path).await?;
            for (i, line) in content.lines().enumerate() {
                if line.to_lowercase().contains(&needle) {
                    total += 1;
                    if matches.len() < MAX_MATCHES {
                        matches.push(format!("{}:{}: {}", entry.path, i + 1, line.trim()));
                    }
                }
            }
        }

        ctx.logger.log(format!("{total} matches for '{query}'"));
        if matches.is_empty() {
            return Ok(ToolExecutionResult::Executed(format!("No matches for '{query}'")));
        }
        let mut out = matches.join("\n");
        if total > MAX_MATCHES {
            out.push_str(&format!(
                "\n... {} more matches not shown; narrow the query or path",
                total - MAX_MATCHES
            ));
        }
        Ok(ToolExecutionResult::Executed(out))
    }
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search project files for text (case-insensitive). Returns `path:line: text` \
         for each matching line."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to look for"
                },
                "path": {
                    "type": "string",
                    "description": "Only search files under this path prefix"
                }
            },
            "required": ["query"]
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use quill_core::session::PendingChange;

    #[tokio::test]
    async fn finds_lines_case_insensitively() {
        let mut fx = Fixture::new(&[
            ("one.md", "The Lighthouse\nwaves\nlighthouse keeper"),
            ("two.md", "nothing here"),
        ]);
        let result = SearchFilesTool
            .execute(serde_json::json!({"query": "lighthouse"}), &mut fx.ctx())
            .await;
        assert_eq!(
            result,
            ToolExecutionResult::Executed(
                "one.md:1: The Lighthouse\none.md:3: lighthouse keeper".into()
            )
        );
    }

    #[tokio::test]
    async fn searches_pending_content() {
        let mut fx = Fixture::new(&[("one.md", "old text")]);
        fx.pending.push(PendingChange::new(
            "write_file",
            serde_json::json!({}),
            "one.md",
            Some("old text".into()),
            Some("brand new text".into()),
            "Overwrite",
        ));
        let result = SearchFilesTool
            .execute(serde_json::json!({"query": "brand"}), &mut fx.ctx())
            .await;
        assert_eq!(result, ToolExecutionResult::Executed("one.md:1: brand new text".into()));
    }

    #[tokio::test]
    async fn caps_matches() {
        let body = "hit\n".repeat(60);
        let mut fx = Fixture::new(&[("many.md", body.as_str())]);
        let result = SearchFilesTool
            .execute(serde_json::json!({"query": "hit"}), &mut fx.ctx())
            .await;
        let ToolExecutionResult::Executed(text) = result else {
            panic!("expected Executed");
        };
        assert_eq!(text.lines().count(), MAX_MATCHES + 1);
        assert!(text.ends_with("10 more matches not shown; narrow the query or path"));
    }

    #[tokio::test]
    async fn path_prefix_filters() {
        let mut fx = Fixture::new(&[("a/x.md", "word"), ("b/y.md", "word")]);
        let result = SearchFilesTool
            .execute(serde_json::json!({"query": "word", "path": "b/"}), &mut fx.ctx())
            .await;
        assert_eq!(result, ToolExecutionResult::Executed("b/y.md:1: word".into()));
    }
}
