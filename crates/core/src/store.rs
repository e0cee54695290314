//! BlobStore trait — the persistent key-value boundary.
//!
//! Values are JSON strings. Typed access (sessions, pending changes) lives in
//! `quill-store`'s `SessionRepository`. Writes are last-write-wins.

use async_trait::async_trait;

use crate::error::StoreError;

/// The core BlobStore trait.
///
/// Implementations: in-memory (for testing), JSON files, none (no-op).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// The backend name (e.g., "memory", "file", "none").
    fn name(&self) -> &str;

    /// Get the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}
