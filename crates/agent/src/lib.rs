//! The agent engine — the heart of Quill.
//!
//! A turn follows a **Reason → Act → Observe** cycle:
//!
//! 1. **Receive** a user message (or an approval result)
//! 2. **Build context**: system prompt with the project tree and todos,
//!    plus a repaired window of the conversation
//! 3. **Send to the model** through the retrying client
//! 4. **If tool calls**: dispatch them in order, record the responses,
//!    loop back to step 2
//! 5. **If text only**: the turn is complete
//!
//! File edits proposed by tools wait in the pending queue until the user
//! approves or rejects them through the [`ApprovalWorkflow`].

pub mod anti_loop;
pub mod approval;
pub mod dispatcher;
pub mod errors;
pub mod gate;
pub mod loop_runner;
pub mod prompt;
pub mod session;
pub mod window;

pub use anti_loop::AntiLoopGuard;
pub use approval::{ApprovalWorkflow, Resolution};
pub use dispatcher::Dispatcher;
pub use errors::{classify_message, classify_provider};
pub use gate::ReasoningGate;
pub use loop_runner::{ControllerConfig, LoopController};
pub use prompt::{DefaultPromptBuilder, PromptContext, SystemPromptBuilder};
pub use session::SessionBridge;
pub use window::{WindowMeta, build_window};
