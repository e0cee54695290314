//! Session bridge — the single owner of stored sessions and the
//! pending-change queue.
//!
//! Every mutation goes through this type. It publishes a UI event and
//! schedules a debounced persist; the persist runs as a detached task and
//! only logs failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use quill_core::error::{Error, StoreError};
use quill_core::event::{EventBus, UiEvent};
use quill_core::message::Message;
use quill_core::session::{ConversationSession, PendingChange, SessionId};
use quill_store::{SessionRepository, pending_key, sessions_key};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct BridgeState {
    sessions: Vec<ConversationSession>,
    active: Option<SessionId>,
    /// Scoped to the active session
    pending: Vec<PendingChange>,
}

struct Inner {
    project_id: String,
    state: Mutex<BridgeState>,
    repository: SessionRepository,
    bus: EventBus,
    debounce: Duration,
    generation: AtomicU64,
}

/// Shared handle to the session store of one project.
#[derive(Clone)]
pub struct SessionBridge {
    inner: Arc<Inner>,
}

impl SessionBridge {
    pub fn new(
        project_id: impl Into<String>,
        repository: SessionRepository,
        bus: EventBus,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                project_id: project_id.into(),
                state: Mutex::new(BridgeState::default()),
                repository,
                bus,
                debounce,
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.inner.project_id
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Load sessions and pending changes from the store. The most recently
    /// updated session becomes active.
    pub async fn load(&self) -> Result<usize, StoreError> {
        let project = &self.inner.project_id;
        let sessions = self.inner.repository.get_sessions(&sessions_key(project)).await?;
        let pending = self
            .inner
            .repository
            .get_pending_changes(&pending_key(project))
            .await?;

        let mut state = self.inner.state.lock().await;
        state.active = sessions
            .iter()
            .max_by_key(|s| s.updated_at)
            .map(|s| s.id.clone());
        state.sessions = sessions;
        state.pending = pending;
        info!(
            project = %project,
            sessions = state.sessions.len(),
            pending = state.pending.len(),
            backend = self.inner.repository.backend_name(),
            "Sessions loaded"
        );
        Ok(state.sessions.len())
    }

    // ── Sessions ────────────────────────────────────────────────────────

    /// Create a session and make it active.
    pub async fn create_session(&self) -> ConversationSession {
        let session = ConversationSession::new(&self.inner.project_id);
        {
            let mut state = self.inner.state.lock().await;
            state.sessions.push(session.clone());
            self.activate(&mut state, session.id.clone());
        }
        self.inner.bus.publish(UiEvent::SessionUpdated {
            session: session.clone(),
        });
        self.schedule_persist();
        session
    }

    /// Make `id` the active session. Switching clears the pending queue.
    pub async fn switch_session(&self, id: &SessionId) -> Result<ConversationSession, Error> {
        let session = {
            let mut state = self.inner.state.lock().await;
            let session = state
                .sessions
                .iter()
                .find(|s| &s.id == id)
                .cloned()
                .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
            self.activate(&mut state, id.clone());
            session
        };
        self.schedule_persist();
        Ok(session)
    }

    fn activate(&self, state: &mut BridgeState, id: SessionId) {
        if state.active.as_ref() == Some(&id) {
            return;
        }
        if !state.pending.is_empty() {
            debug!(
                discarded = state.pending.len(),
                "Session switch clears pending changes"
            );
            state.pending.clear();
            self.inner
                .bus
                .publish(UiEvent::PendingChangesUpdated { changes: Vec::new() });
        }
        state.active = Some(id);
    }

    pub async fn active_session_id(&self) -> Option<SessionId> {
        self.inner.state.lock().await.active.clone()
    }

    pub async fn session(&self, id: &SessionId) -> Option<ConversationSession> {
        let state = self.inner.state.lock().await;
        state.sessions.iter().find(|s| &s.id == id).cloned()
    }

    pub async fn sessions(&self) -> Vec<ConversationSession> {
        self.inner.state.lock().await.sessions.clone()
    }

    /// Remove a session. Returns false if it did not exist.
    pub async fn delete_session(&self, id: &SessionId) -> bool {
        let removed = {
            let mut state = self.inner.state.lock().await;
            let before = state.sessions.len();
            state.sessions.retain(|s| &s.id != id);
            let removed = state.sessions.len() != before;
            if removed && state.active.as_ref() == Some(id) {
                state.active = None;
                state.pending.clear();
            }
            removed
        };
        if removed {
            self.schedule_persist();
        }
        removed
    }

    /// Store `session` as the current value and tell the UI. A session that
    /// was deleted in the meantime stays deleted.
    pub async fn publish(&self, session: &ConversationSession) {
        {
            let mut state = self.inner.state.lock().await;
            let Some(stored) = state.sessions.iter_mut().find(|s| s.id == session.id) else {
                debug!(session_id = %session.id, "Publish ignored: session was deleted");
                return;
            };
            *stored = session.clone();
        }
        self.inner.bus.publish(UiEvent::SessionUpdated {
            session: session.clone(),
        });
        self.schedule_persist();
    }

    /// Append a message to a stored session.
    pub async fn append_message(
        &self,
        id: &SessionId,
        message: Message,
    ) -> Result<ConversationSession, Error> {
        let session = {
            let mut state = self.inner.state.lock().await;
            let session = state
                .sessions
                .iter_mut()
                .find(|s| &s.id == id)
                .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
            session.push(message);
            session.clone()
        };
        self.inner.bus.publish(UiEvent::SessionUpdated {
            session: session.clone(),
        });
        self.schedule_persist();
        Ok(session)
    }

    // ── Pending changes ─────────────────────────────────────────────────

    pub async fn pending_changes(&self) -> Vec<PendingChange> {
        self.inner.state.lock().await.pending.clone()
    }

    pub async fn push_pending(&self, change: PendingChange) {
        let changes = {
            let mut state = self.inner.state.lock().await;
            state.pending.push(change);
            state.pending.clone()
        };
        self.pending_updated(changes);
    }

    /// Remove and return the change with `id`, if queued.
    pub async fn take_pending(&self, id: &str) -> Option<PendingChange> {
        let (taken, changes) = {
            let mut state = self.inner.state.lock().await;
            let index = state.pending.iter().position(|c| c.id == id)?;
            let taken = state.pending.remove(index);
            (taken, state.pending.clone())
        };
        self.pending_updated(changes);
        Some(taken)
    }

    /// Put a change back at its original position after a failed commit.
    pub async fn restore_pending(&self, change: PendingChange) {
        let changes = {
            let mut state = self.inner.state.lock().await;
            let index = state
                .pending
                .iter()
                .position(|c| c.timestamp > change.timestamp)
                .unwrap_or(state.pending.len());
            state.pending.insert(index, change);
            state.pending.clone()
        };
        self.pending_updated(changes);
    }

    /// Remove every queued change, oldest first.
    pub async fn take_all_pending(&self) -> Vec<PendingChange> {
        let taken = std::mem::take(&mut self.inner.state.lock().await.pending);
        if !taken.is_empty() {
            self.pending_updated(Vec::new());
        }
        taken
    }

    fn pending_updated(&self, changes: Vec<PendingChange>) {
        self.inner
            .bus
            .publish(UiEvent::PendingChangesUpdated { changes });
        self.schedule_persist();
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Persist after the debounce interval unless another mutation comes in
    /// first.
    fn schedule_persist(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            if inner.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(e) = inner.persist().await {
                warn!(project = %inner.project_id, error = %e, "Failed to persist sessions");
            }
        });
    }

    /// Persist now.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.inner.persist().await
    }
}

impl Inner {
    async fn persist(&self) -> Result<(), StoreError> {
        let (sessions, pending) = {
            let state = self.state.lock().await;
            (state.sessions.clone(), state.pending.clone())
        };
        self.repository
            .save_sessions(&sessions_key(&self.project_id), &sessions)
            .await?;
        self.repository
            .save_pending_changes(&pending_key(&self.project_id), &pending)
            .await?;
        debug!(
            project = %self.project_id,
            sessions = sessions.len(),
            pending = pending.len(),
            "Sessions persisted"
        );
        Ok(())
    }
}

impl std::fmt::Debug for SessionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBridge")
            .field("project_id", &self.inner.project_id)
            .field("debounce", &self.inner.debounce)
            .finish()
    }
}
