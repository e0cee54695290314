//! Integration tests: proposed changes are visible to every later read
//! before the user approves them.

use quill_core::agent::AgentMode;
use quill_core::files::FileStore;
use quill_core::session::{PendingChange, TodoItem};
use quill_core::tool::{ToolContext, ToolExecutionResult, ToolLogger, ToolRegistry};
use quill_store::InMemoryFileStore;
use quill_tools::default_registry;
use tokio_util::sync::CancellationToken;

// ── Harness ──────────────────────────────────────────────────────────────

/// Runs tools against a file store the way the dispatcher does: every
/// `ApprovalRequired` result is queued as a pending change.
struct Workbench {
    registry: ToolRegistry,
    files: InMemoryFileStore,
    pending: Vec<PendingChange>,
    todos: Vec<TodoItem>,
}

impl Workbench {
    fn new(files: &[(&str, &str)]) -> Self {
        Self {
            registry: default_registry(),
            files: InMemoryFileStore::with_files(files.iter().copied()),
            pending: Vec::new(),
            todos: Vec::new(),
        }
    }

    async fn call(&mut self, name: &str, args: serde_json::Value) -> ToolExecutionResult {
        let tool = self.registry.resolve(name, AgentMode::Edit).unwrap();
        let mut ctx = ToolContext {
            files: &self.files,
            pending: &self.pending,
            todos: &mut self.todos,
            mode: AgentMode::Edit,
            logger: ToolLogger::detached(name),
            cancel: CancellationToken::new(),
        };
        let result = tool.execute(args, &mut ctx).await;
        if let ToolExecutionResult::ApprovalRequired(change) = &result {
            self.pending.push(change.clone());
        }
        result
    }

    async fn read(&mut self, path: &str) -> String {
        match self.call("read_file", serde_json::json!({"path": path})).await {
            ToolExecutionResult::Executed(content) => content,
            other => panic!("read_file failed: {other:?}"),
        }
    }
}

// ── Shadow reads ─────────────────────────────────────────────────────────

#[tokio::test]
async fn write_then_read_sees_proposed_content() {
    let mut bench = Workbench::new(&[("ch1.md", "Draft one.")]);

    let result = bench
        .call(
            "write_file",
            serde_json::json!({"thinking": "rewrite", "path": "ch1.md", "content": "Draft two."}),
        )
        .await;
    assert!(matches!(result, ToolExecutionResult::ApprovalRequired(_)));

    assert_eq!(bench.read("ch1.md").await, "Draft two.");
    assert_eq!(bench.files.read("ch1.md").await.unwrap(), "Draft one.");
}

#[tokio::test]
async fn chained_patches_build_on_each_other() {
    let mut bench = Workbench::new(&[("ch1.md", "red fox, blue sky")]);

    for (search, replace) in [("red", "grey"), ("blue", "black")] {
        let result = bench
            .call(
                "patch_file",
                serde_json::json!({
                    "thinking": "tone",
                    "path": "ch1.md",
                    "edits": [{"search": search, "replace": replace}]
                }),
            )
            .await;
        assert!(matches!(result, ToolExecutionResult::ApprovalRequired(_)));
    }

    assert_eq!(bench.read("ch1.md").await, "grey fox, black sky");
    // both changes remember the committed original
    assert!(
        bench
            .pending
            .iter()
            .all(|c| c.original_content.as_deref() == Some("red fox, blue sky"))
    );
}

#[tokio::test]
async fn listing_and_search_include_pending_files() {
    let mut bench = Workbench::new(&[("notes.md", "plot")]);
    bench
        .call(
            "write_file",
            serde_json::json!({"thinking": "new", "path": "ch2.md", "content": "The storm broke."}),
        )
        .await;

    let ToolExecutionResult::Executed(tree) = bench.call("list_files", serde_json::json!({})).await
    else {
        panic!("list_files failed");
    };
    assert_eq!(tree, "ch2.md (16 bytes) [pending new]\nnotes.md (4 bytes)");

    let ToolExecutionResult::Executed(hits) = bench
        .call("search_files", serde_json::json!({"query": "STORM"}))
        .await
    else {
        panic!("search_files failed");
    };
    assert_eq!(hits, "ch2.md:1: The storm broke.");
}

#[tokio::test]
async fn pending_delete_hides_the_file() {
    let mut bench = Workbench::new(&[("old.md", "gone soon")]);
    bench
        .call("delete_file", serde_json::json!({"thinking": "cut", "path": "old.md"}))
        .await;

    let result = bench.call("read_file", serde_json::json!({"path": "old.md"})).await;
    assert!(matches!(result, ToolExecutionResult::Error(_)));
    assert!(bench.files.exists("old.md").await.unwrap());
}
