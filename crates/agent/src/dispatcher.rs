//! Tool dispatcher — runs one tool call and streams its log.

use quill_core::agent::AgentMode;
use quill_core::event::EventBus;
use quill_core::files::FileStore;
use quill_core::message::ToolCallRequest;
use quill_core::session::{PendingChange, SessionId, TodoItem};
use quill_core::tool::{ToolContext, ToolExecutionResult, ToolLogger, ToolRegistry};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::gate::ReasoningGate;

/// Error text for calls skipped because the user stopped the turn.
pub const NOT_EXECUTED: &str = "not executed: stopped by user";

/// Borrowed view of what a tool call needs. Built once per iteration.
pub struct Dispatcher<'a> {
    pub registry: &'a ToolRegistry,
    pub files: &'a dyn FileStore,
    pub bus: &'a EventBus,
    pub session_id: &'a SessionId,
    pub mode: AgentMode,
}

impl Dispatcher<'_> {
    fn logger(&self, call: &ToolCallRequest) -> ToolLogger {
        ToolLogger::new(
            self.session_id.clone(),
            call.id.as_str(),
            call.name.as_str(),
            Some(self.bus.clone()),
        )
    }

    /// Execute `call`. Never fails: gate rejections, unknown tools and tools
    /// outside the mode become `Error` results.
    pub async fn dispatch(
        &self,
        call: &ToolCallRequest,
        gate: &mut ReasoningGate,
        pending: &[PendingChange],
        todos: &mut Vec<TodoItem>,
        cancel: &CancellationToken,
    ) -> ToolExecutionResult {
        let logger = self.logger(call);
        logger.log(format!("started {}", call.name));

        if let Err(reason) = gate.check(&call.name) {
            logger.log(format!("rejected by reasoning gate: {} must be called first", gate.tool()));
            return ToolExecutionResult::Error(reason);
        }

        let tool = match self.registry.resolve(&call.name, self.mode) {
            Ok(tool) => tool,
            Err(e) => {
                logger.log(format!("failed: {e}"));
                return e.into();
            }
        };

        let started = Instant::now();
        let mut ctx = ToolContext {
            files: self.files,
            pending,
            todos,
            mode: self.mode,
            logger: logger.clone(),
            cancel: cancel.clone(),
        };
        let result = tool.execute(call.args.clone(), &mut ctx).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        if matches!(result, ToolExecutionResult::Executed(_)) {
            gate.record(&call.name);
        }

        let outcome = match &result {
            ToolExecutionResult::Executed(_) => "executed".to_string(),
            ToolExecutionResult::ApprovalRequired(change) => {
                format!("waiting for approval: {}", change.description)
            }
            ToolExecutionResult::Error(message) => format!("failed: {message}"),
        };
        logger.log(format!("{outcome} ({duration_ms} ms)"));
        debug!(
            session_id = %self.session_id,
            tool = %call.name,
            call_id = %call.id,
            status = ?result.status(),
            duration_ms,
            "Tool dispatched"
        );
        result
    }
}
