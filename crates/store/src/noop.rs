//! No-op blob store — disables persistence entirely.

use async_trait::async_trait;
use quill_core::error::StoreError;
use quill_core::store::BlobStore;

/// A no-op store that keeps nothing.
pub struct NoopStore;

#[async_trait]
impl BlobStore for NoopStore {
    fn name(&self) -> &str {
        "none"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Ok(false)
    }
}
