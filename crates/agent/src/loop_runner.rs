//! The loop controller — one ReAct turn per call.
//!
//! A turn repeats: build the prompt and window, call the model, record its
//! answer, dispatch the requested tools in order. It ends when the model
//! answers without tool calls, when the iteration ceiling is hit, when the
//! user cancels, or on the first terminal error. Only one turn runs per
//! session; a second request while one is running is a no-op.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use quill_config::{AgentSettings, AppConfig};
use quill_core::agent::{GatePolicy, TurnOutcome};
use quill_core::error::{Error, ProviderError};
use quill_core::error_record::ErrorRecord;
use quill_core::event::UiEvent;
use quill_core::files::FileStore;
use quill_core::message::{
    Message, MessageBody, ResponseStatus, SystemKind, ToolCallRequest, ToolResponse,
};
use quill_core::provider::{FinishReason, ProviderRequest, ToolChoice};
use quill_core::session::{ConversationSession, SessionId};
use quill_core::tool::{ToolExecutionResult, ToolRegistry};
use quill_providers::LlmClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::anti_loop::AntiLoopGuard;
use crate::dispatcher::{Dispatcher, NOT_EXECUTED};
use crate::errors::{classify_provider, empty_response};
use crate::gate::ReasoningGate;
use crate::prompt::{DefaultPromptBuilder, PromptContext, SystemPromptBuilder};
use crate::session::SessionBridge;
use crate::window::build_window;

/// Model parameters and agent policy for the controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub agent: AgentSettings,
}

impl ControllerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
            agent: config.agent.clone(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

type RunningMap = Mutex<HashMap<SessionId, CancellationToken>>;

/// Marks a session as running until dropped.
struct RunningGuard<'a> {
    running: &'a RunningMap,
    session_id: SessionId,
    cancel: CancellationToken,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.session_id);
    }
}

/// Drives turns for the sessions of one project.
pub struct LoopController {
    /// The retrying client, swapped by `set_client`
    client: RwLock<LlmClient>,

    /// Tools declared to the model, in declaration order
    registry: Arc<ToolRegistry>,

    /// Committed project files
    files: Arc<dyn FileStore>,

    /// Stored sessions and the pending-change queue
    bridge: SessionBridge,

    /// Builds the system instruction each iteration
    prompt: Arc<dyn SystemPromptBuilder>,

    /// Model parameters and agent policy
    config: ControllerConfig,

    /// Cancellation tokens of the turns in flight, by session
    running: RunningMap,
}

impl LoopController {
    pub fn new(
        client: LlmClient,
        registry: Arc<ToolRegistry>,
        files: Arc<dyn FileStore>,
        bridge: SessionBridge,
        config: ControllerConfig,
    ) -> Self {
        Self {
            client: RwLock::new(client),
            registry,
            files,
            bridge,
            prompt: Arc::new(DefaultPromptBuilder::default()),
            config,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the system prompt builder.
    pub fn with_prompt_builder(mut self, prompt: Arc<dyn SystemPromptBuilder>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Swap the LLM client. Running turns keep the client they started with.
    pub fn set_client(&self, client: LlmClient) {
        info!(provider = client.provider_name(), "LLM client replaced");
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = client;
    }

    fn client(&self) -> LlmClient {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn bridge(&self) -> &SessionBridge {
        &self.bridge
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn is_running(&self, session_id: &SessionId) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(session_id)
    }

    /// Signal the running turn of `session_id` to stop. Returns false when
    /// nothing was running.
    pub fn cancel(&self, session_id: &SessionId) -> bool {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        match running.get(session_id) {
            Some(token) => {
                info!(session_id = %session_id, "Cancelling turn");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Delete a session, stopping its turn first if one is running.
    pub async fn delete_session(&self, session_id: &SessionId) -> bool {
        self.cancel(session_id);
        self.bridge.delete_session(session_id).await
    }

    fn try_start(&self, session_id: &SessionId) -> Option<RunningGuard<'_>> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.contains_key(session_id) {
            return None;
        }
        let cancel = CancellationToken::new();
        running.insert(session_id.clone(), cancel.clone());
        Some(RunningGuard {
            running: &self.running,
            session_id: session_id.clone(),
            cancel,
        })
    }

    /// Append a user message and run a turn. The session becomes the active
    /// one, so the pending queue belongs to it.
    pub async fn send_message(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> Result<TurnOutcome, Error> {
        let Some(guard) = self.try_start(session_id) else {
            debug!(session_id = %session_id, "Turn already running; message ignored");
            return Ok(TurnOutcome::AlreadyRunning);
        };
        let mut session = self.bridge.switch_session(session_id).await?;
        session.push(Message::user(text));
        self.bridge.publish(&session).await;
        Ok(self.run(session, &guard.cancel).await)
    }

    /// Run a turn over the existing history, e.g. after an approval result.
    /// Like `send_message`, this activates the session first.
    pub async fn process_turn(&self, session_id: &SessionId) -> Result<TurnOutcome, Error> {
        let Some(guard) = self.try_start(session_id) else {
            debug!(session_id = %session_id, "Turn already running");
            return Ok(TurnOutcome::AlreadyRunning);
        };
        let session = self.bridge.switch_session(session_id).await?;
        Ok(self.run(session, &guard.cancel).await)
    }

    async fn run(&self, mut session: ConversationSession, cancel: &CancellationToken) -> TurnOutcome {
        let session_id = session.id.clone();
        info!(
            session_id = %session_id,
            messages = session.messages.len(),
            mode = %self.config.agent.mode,
            "Turn started"
        );
        self.bridge.bus().publish(UiEvent::TurnStarted {
            session_id: session_id.clone(),
        });

        let outcome = self.iterate(&mut session, cancel).await;

        info!(session_id = %session_id, outcome = ?outcome, "Turn finished");
        self.bridge.bus().publish(UiEvent::TurnFinished {
            session_id,
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn iterate(
        &self,
        session: &mut ConversationSession,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let settings = &self.config.agent;
        let client = self.client();
        let mut anti_loop = AntiLoopGuard::new(settings.anti_loop_threshold);

        let policy = if self.registry.get(&settings.reasoning_tool).is_some() {
            settings.gate_policy
        } else {
            warn!(
                tool = %settings.reasoning_tool,
                "Reasoning tool is not registered; gate disabled"
            );
            GatePolicy::Disabled
        };
        let mut gate = ReasoningGate::new(policy, &settings.reasoning_tool, session.last_message());

        for iteration in 1..=settings.max_loops {
            if cancel.is_cancelled() {
                return self.stop(session).await;
            }

            let forced = gate.begin_iteration(iteration);
            let pending = self.bridge.pending_changes().await;
            let system_instruction = self
                .prompt
                .build(&PromptContext {
                    files: self.files.as_ref(),
                    pending: &pending,
                    mode: settings.mode,
                    todos: &session.todos,
                    reasoning_tool: &settings.reasoning_tool,
                })
                .await;
            let (messages, window) = build_window(&session.messages, settings.window_size);

            debug!(
                session_id = %session.id,
                iteration,
                in_context = window.in_context,
                dropped = window.dropped,
                forced,
                "Calling model"
            );

            let request = ProviderRequest {
                model: self.config.model.clone(),
                system_instruction,
                messages,
                tools: self.registry.definitions(settings.mode),
                tool_choice: if forced {
                    ToolChoice::Function(settings.reasoning_tool.clone())
                } else {
                    ToolChoice::Auto
                },
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
            };

            let response = match client.send(request, cancel).await {
                Ok(response) => response,
                Err(ProviderError::Cancelled) => return self.stop(session).await,
                Err(e) => return self.fault(session, classify_provider(&e)).await,
            };
            if cancel.is_cancelled() {
                return self.stop(session).await;
            }

            let metadata = response.metadata;
            let Some(candidate) = response.candidates.into_iter().next() else {
                return self.fault(session, empty_response()).await;
            };
            let finish_reason = candidate.finish_reason.or(metadata.finish_reason);
            let debug_payload = serde_json::json!({
                "model": metadata.model,
                "finish_reason": finish_reason,
                "usage": metadata.usage,
                "duration_ms": metadata.duration_ms,
                "attempts": metadata.attempts,
                "window": window,
                "forced_tool": forced.then(|| settings.reasoning_tool.clone()),
            });

            let text = candidate.text.filter(|t| !t.trim().is_empty());
            let calls = candidate.tool_calls;

            if text.is_none() && calls.is_empty() {
                warn!(session_id = %session.id, iteration, "Model returned an empty candidate");
                let mut notice = Message::system(
                    SystemKind::Notice,
                    "The model returned an empty answer. Try rephrasing the request.",
                );
                notice.metadata.warning = Some("empty response".into());
                notice.metadata.debug = Some(debug_payload);
                notice.metadata.loop_count = Some(iteration);
                session.push(notice);
                self.bridge.publish(session).await;
                return TurnOutcome::Completed;
            }

            let mut answer = Message::model(text, calls.clone());
            answer.metadata.debug = Some(debug_payload);
            answer.metadata.loop_count = Some(iteration);
            if finish_reason == Some(FinishReason::Length) {
                warn!(session_id = %session.id, iteration, "Response truncated at the token limit");
                answer.metadata.warning =
                    Some("The response was cut off because it reached the token limit.".into());
            }
            session.push(answer);
            self.bridge.publish(session).await;

            if calls.is_empty() {
                return TurnOutcome::Completed;
            }

            session.push(Message::tool_responses(Vec::new()));
            let slot = session.messages.len() - 1;
            self.bridge.publish(session).await;

            let session_id = session.id.clone();
            let dispatcher = Dispatcher {
                registry: &self.registry,
                files: self.files.as_ref(),
                bus: self.bridge.bus(),
                session_id: &session_id,
                mode: settings.mode,
            };

            for (index, call) in calls.iter().enumerate() {
                let pending = self.bridge.pending_changes().await;
                let result = dispatcher
                    .dispatch(call, &mut gate, &pending, &mut session.todos, cancel)
                    .await;
                if let ToolExecutionResult::ApprovalRequired(change) = &result {
                    self.bridge.push_pending(change.clone()).await;
                }
                push_response(session, slot, tool_response(call, &result, &mut anti_loop));
                self.bridge.publish(session).await;

                if cancel.is_cancelled() {
                    for skipped in &calls[index + 1..] {
                        push_response(session, slot, not_executed(skipped));
                    }
                    return self.stop(session).await;
                }
            }
        }

        warn!(
            session_id = %session.id,
            max_loops = settings.max_loops,
            "Iteration limit reached"
        );
        session.push(Message::system(
            SystemKind::IterationLimit,
            format!(
                "Stopped after {} steps without finishing. Send a message to let the \
                 assistant continue.",
                settings.max_loops
            ),
        ));
        self.bridge.publish(session).await;
        TurnOutcome::IterationLimit
    }

    async fn stop(&self, session: &mut ConversationSession) -> TurnOutcome {
        info!(session_id = %session.id, "Turn stopped by user");
        session.push(Message::system(SystemKind::Stopped, "Stopped by user."));
        self.bridge.publish(session).await;
        TurnOutcome::Cancelled
    }

    async fn fault(&self, session: &mut ConversationSession, record: ErrorRecord) -> TurnOutcome {
        warn!(
            session_id = %session.id,
            category = ?record.category,
            title = %record.title,
            "Turn failed"
        );
        let mut message = Message::system(SystemKind::Error, record.render());
        message.metadata.error = Some(record.clone());
        session.push(message);
        self.bridge.publish(session).await;
        TurnOutcome::Faulted { record }
    }
}

/// Record a result as the model will see it. Errors pass through the
/// anti-loop guard; the original text stays in `raw_error`.
fn tool_response(
    call: &ToolCallRequest,
    result: &ToolExecutionResult,
    anti_loop: &mut AntiLoopGuard,
) -> ToolResponse {
    let (output, raw_error) = match result {
        ToolExecutionResult::Error(message) => (
            anti_loop
                .observe(&call.name, message)
                .unwrap_or_else(|| result.model_text()),
            Some(message.clone()),
        ),
        _ => (result.model_text(), None),
    };
    ToolResponse {
        call_id: call.id.clone(),
        name: call.name.clone(),
        status: result.status(),
        output,
        raw_error,
    }
}

fn not_executed(call: &ToolCallRequest) -> ToolResponse {
    ToolResponse {
        call_id: call.id.clone(),
        name: call.name.clone(),
        status: ResponseStatus::Error,
        output: format!("Error: {NOT_EXECUTED}"),
        raw_error: Some(NOT_EXECUTED.into()),
    }
}

/// Add a response to the iteration's shared tool-response message.
fn push_response(session: &mut ConversationSession, slot: usize, response: ToolResponse) {
    if let Some(MessageBody::ToolResponses { responses }) =
        session.messages.get_mut(slot).map(|m| &mut m.body)
    {
        responses.push(response);
    }
    session.touch();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: format!("call_{name}"),
            name: name.into(),
            args: serde_json::json!({}),
        }
    }

    #[test]
    fn repeated_errors_are_replaced_but_kept_raw() {
        let mut guard = AntiLoopGuard::new(2);
        let result = ToolExecutionResult::Error("File not found: a.md".into());

        let first = tool_response(&call("read_file"), &result, &mut guard);
        assert_eq!(first.output, "Error: File not found: a.md");
        assert_eq!(first.raw_error.as_deref(), Some("File not found: a.md"));

        let second = tool_response(&call("read_file"), &result, &mut guard);
        assert!(second.output.starts_with("STOP."));
        assert_eq!(second.raw_error.as_deref(), Some("File not found: a.md"));
        assert_eq!(second.status, ResponseStatus::Error);
    }

    #[test]
    fn successful_results_have_no_raw_error() {
        let mut guard = AntiLoopGuard::new(2);
        let response = tool_response(
            &call("read_file"),
            &ToolExecutionResult::Executed("text".into()),
            &mut guard,
        );
        assert_eq!(response.output, "text");
        assert_eq!(response.raw_error, None);
    }

    #[test]
    fn responses_share_one_message() {
        let mut session = ConversationSession::new("p");
        session.push(Message::tool_responses(Vec::new()));
        push_response(&mut session, 0, not_executed(&call("a")));
        push_response(&mut session, 0, not_executed(&call("b")));
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].responses().len(), 2);
        assert_eq!(session.messages[0].responses()[1].output, "Error: not executed: stopped by user");
    }

    #[test]
    fn config_follows_app_config() {
        let app = AppConfig::default();
        let config = ControllerConfig::from_app_config(&app);
        assert_eq!(config.model, app.default_model);
        assert_eq!(config.max_tokens, Some(8192));
        assert_eq!(config.agent.max_loops, 30);
    }
}
