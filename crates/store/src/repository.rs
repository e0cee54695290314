//! Typed access to sessions and pending changes on top of a [`BlobStore`].

use quill_core::error::StoreError;
use quill_core::session::{ConversationSession, PendingChange};
use quill_core::store::BlobStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Store key holding a project's sessions.
pub fn sessions_key(project_id: &str) -> String {
    format!("sessions.{project_id}")
}

/// Store key holding a project's pending changes.
pub fn pending_key(project_id: &str) -> String {
    format!("pending.{project_id}")
}

/// Reads and writes whole collections. Last write wins.
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn BlobStore>,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &str {
        self.store.name()
    }

    pub async fn get_sessions(&self, key: &str) -> Result<Vec<ConversationSession>, StoreError> {
        self.load(key).await
    }

    pub async fn save_sessions(
        &self,
        key: &str,
        sessions: &[ConversationSession],
    ) -> Result<(), StoreError> {
        self.save(key, sessions).await
    }

    pub async fn get_pending_changes(&self, key: &str) -> Result<Vec<PendingChange>, StoreError> {
        self.load(key).await
    }

    pub async fn save_pending_changes(
        &self,
        key: &str,
        changes: &[PendingChange],
    ) -> Result<(), StoreError> {
        self.save(key, changes).await
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|e| StoreError::Corrupted {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    async fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(items)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize {key}: {e}")))?;
        debug!(key, count = items.len(), backend = self.store.name(), "Persisting");
        self.store.put(key, &raw).await
    }
}
