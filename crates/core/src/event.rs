//! UI event bus — everything the host UI can observe.
//!
//! The engine never calls into the UI. It publishes events here and the host
//! subscribes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::agent::TurnOutcome;
use crate::session::{ConversationSession, PendingChange, SessionId};

/// All UI-observable effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    /// A session changed (new message, edited tool responses, todos)
    SessionUpdated { session: ConversationSession },

    /// One line from a running tool
    ToolLog {
        session_id: SessionId,
        call_id: String,
        tool_name: String,
        line: String,
        timestamp: DateTime<Utc>,
    },

    /// The pending-change queue changed
    PendingChangesUpdated { changes: Vec<PendingChange> },

    TurnStarted { session_id: SessionId },

    TurnFinished {
        session_id: SessionId,
        outcome: TurnOutcome,
    },
}

/// A broadcast-based event bus for UI events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Cloning the bus
/// shares the channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<UiEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: UiEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<UiEvent>> {
        self.sender.subscribe()
    }

    /// Subscribe as a stream. Events missed by a lagging consumer are
    /// skipped.
    pub fn stream(&self) -> impl tokio_stream::Stream<Item = Arc<UiEvent>> + Send + 'static {
        BroadcastStream::new(self.sender.subscribe()).filter_map(|item| item.ok())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}
