//! Context window builder.
//!
//! Takes the tail of the transcript and repairs it so that every model
//! message with tool calls is immediately followed by its tool responses.
//! Providers reject a tool call without a paired result, so the sent slice
//! must never contain one.

use quill_core::message::Message;
use serde::Serialize;

/// What the builder kept and dropped. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowMeta {
    pub in_context: usize,
    /// Messages outside the window plus messages removed by repair
    pub dropped: usize,
    pub window_size: usize,
}

/// Build the message slice sent to the model.
pub fn build_window(messages: &[Message], window_size: usize) -> (Vec<Message>, WindowMeta) {
    let start = messages.len().saturating_sub(window_size);
    let tail = messages[start..].to_vec();
    let before = tail.len();
    let window = repair(tail);

    let meta = WindowMeta {
        in_context: window.len(),
        dropped: start + (before - window.len()),
        window_size,
    };
    (window, meta)
}

/// Front-edge repair followed by one dangling-call scan.
pub fn repair(mut window: Vec<Message>) -> Vec<Message> {
    // A leading tool call has lost the context that asked for it.
    let leading = window
        .iter()
        .take_while(|m| m.has_tool_calls())
        .count();
    window.drain(..leading);

    let paired: Vec<bool> = (0..window.len())
        .map(|i| {
            !window[i].has_tool_calls()
                || window.get(i + 1).is_some_and(Message::is_tool_responses)
        })
        .collect();

    window
        .into_iter()
        .zip(paired)
        .filter_map(|(message, keep)| keep.then_some(message))
        .collect()
}

/// True when every tool-call message is directly followed by responses and
/// the slice does not open with a tool call.
pub fn is_valid(window: &[Message]) -> bool {
    if window.first().is_some_and(Message::has_tool_calls) {
        return false;
    }
    window.iter().enumerate().all(|(i, m)| {
        !m.has_tool_calls() || window.get(i + 1).is_some_and(Message::is_tool_responses)
    })
}
