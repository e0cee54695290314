//! File-domain boundary — the project files the agent reads and edits.
//!
//! The engine never touches storage directly. Hosts provide a `FileStore`;
//! protected-path rules and tree building stay on the host side.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FileError;

/// One file as listed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Project-relative path using `/` separators
    pub path: String,
    /// Size in bytes
    pub size: usize,
}

/// A single search/replace edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub search: String,
    pub replace: String,
}

/// Storage for project files.
///
/// Mutating operations return a short human-readable confirmation that can
/// be handed back to the model as tool output.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// A human-readable name for this store (e.g., "memory", "local").
    fn name(&self) -> &str;

    /// Read committed content.
    async fn read(&self, path: &str) -> Result<String, FileError>;

    /// Create or overwrite a file.
    async fn write(&self, path: &str, content: &str) -> Result<String, FileError>;

    /// Rename a file. Fails if `to` exists.
    async fn rename(&self, from: &str, to: &str) -> Result<String, FileError>;

    async fn delete(&self, path: &str) -> Result<String, FileError>;

    /// All files, sorted by path.
    async fn list(&self) -> Result<Vec<FileEntry>, FileError>;

    async fn exists(&self, path: &str) -> Result<bool, FileError> {
        match self.read(path).await {
            Ok(_) => Ok(true),
            Err(FileError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Host veto for writes. Nothing is protected by default.
    fn is_protected(&self, _path: &str) -> bool {
        false
    }
}

/// Normalize a project-relative path.
///
/// Strips leading `./` and `/`, converts `\` to `/`, and rejects empty paths
/// and parent-directory components.
pub fn normalize_path(path: &str) -> Result<String, FileError> {
    let unified = path.trim().replace('\\', "/");
    let mut parts = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                return Err(FileError::InvalidPath {
                    path: path.to_string(),
                    reason: "parent directory components are not allowed".into(),
                });
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return Err(FileError::InvalidPath {
            path: path.to_string(),
            reason: "path is empty".into(),
        });
    }
    Ok(parts.join("/"))
}

/// Apply edits in order. Each `search` must match exactly once in the
/// content produced by the previous edits.
pub fn apply_edits(path: &str, content: &str, edits: &[TextEdit]) -> Result<String, FileError> {
    if edits.is_empty() {
        return Err(FileError::PatchFailed {
            path: path.to_string(),
            reason: "no edits given".into(),
        });
    }

    let mut current = content.to_string();
    for (i, edit) in edits.iter().enumerate() {
        if edit.search.is_empty() {
            return Err(FileError::PatchFailed {
                path: path.to_string(),
                reason: format!("edit {} has an empty search string", i + 1),
            });
        }
        match current.matches(edit.search.as_str()).count() {
            0 => {
                return Err(FileError::PatchFailed {
                    path: path.to_string(),
                    reason: format!("edit {}: search text not found", i + 1),
                });
            }
            1 => current = current.replacen(edit.search.as_str(), &edit.replace, 1),
            n => {
                return Err(FileError::PatchFailed {
                    path: path.to_string(),
                    reason: format!(
                        "edit {}: search text matches {n} times, include more context",
                        i + 1
                    ),
                });
            }
        }
    }
    Ok(current)
}
