//! Persistence and file-domain stores for Quill.
//!
//! - Blob stores: [`InMemoryStore`], [`FileStoreBackend`] (one JSON document
//!   per key) and [`NoopStore`]
//! - [`SessionRepository`]: typed sessions and pending changes on top of a
//!   blob store
//! - File domains: [`InMemoryFileStore`] and [`LocalFileStore`]

pub mod file_backend;
pub mod files;
pub mod in_memory;
pub mod local_files;
pub mod noop;
pub mod repository;

pub use file_backend::FileStoreBackend;
pub use files::InMemoryFileStore;
pub use in_memory::InMemoryStore;
pub use local_files::LocalFileStore;
pub use noop::NoopStore;
pub use repository::{SessionRepository, pending_key, sessions_key};

use quill_config::StoreConfig;
use quill_core::store::BlobStore;
use std::sync::Arc;

/// Build the blob store named by `config.backend`.
pub fn build_store(config: &StoreConfig) -> Arc<dyn BlobStore> {
    match config.backend.as_str() {
        "memory" => Arc::new(InMemoryStore::new()),
        "none" => Arc::new(NoopStore),
        _ => Arc::new(FileStoreBackend::new(config.resolved_path())),
    }
}
