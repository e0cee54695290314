//! Project files in a local directory.

use async_trait::async_trait;
use quill_core::error::FileError;
use quill_core::files::{FileEntry, FileStore, normalize_path};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A [`FileStore`] rooted at a directory on disk. Paths are normalized before
/// they touch the filesystem, so nothing outside the root is reachable.
/// Hidden entries (names starting with `.`) are not listed.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<(String, PathBuf), FileError> {
        let normalized = normalize_path(path)?;
        let full = self.root.join(&normalized);
        Ok((normalized, full))
    }
}

fn io_error(path: &str, e: std::io::Error) -> FileError {
    if e.kind() == std::io::ErrorKind::NotFound {
        FileError::NotFound(path.to_string())
    } else {
        FileError::Io {
            path: path.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn read(&self, path: &str) -> Result<String, FileError> {
        let (normalized, full) = self.resolve(path)?;
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| io_error(&normalized, e))
    }

    async fn write(&self, path: &str, content: &str) -> Result<String, FileError> {
        let (normalized, full) = self.resolve(path)?;
        let existed = tokio::fs::try_exists(&full).await.unwrap_or(false);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(&normalized, e))?;
        }
        tokio::fs::write(&full, content)
            .await
            .map_err(|e| io_error(&normalized, e))?;
        debug!(path = %normalized, bytes = content.len(), "Wrote file");
        Ok(if existed {
            format!("Updated {normalized}")
        } else {
            format!("Created {normalized}")
        })
    }

    async fn rename(&self, from: &str, to: &str) -> Result<String, FileError> {
        let (from_norm, from_full) = self.resolve(from)?;
        let (to_norm, to_full) = self.resolve(to)?;
        if !tokio::fs::try_exists(&from_full).await.unwrap_or(false) {
            return Err(FileError::NotFound(from_norm));
        }
        if tokio::fs::try_exists(&to_full).await.unwrap_or(false) {
            return Err(FileError::AlreadyExists(to_norm));
        }
        if let Some(parent) = to_full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(&to_norm, e))?;
        }
        tokio::fs::rename(&from_full, &to_full)
            .await
            .map_err(|e| io_error(&from_norm, e))?;
        Ok(format!("Renamed {from_norm} to {to_norm}"))
    }

    async fn delete(&self, path: &str) -> Result<String, FileError> {
        let (normalized, full) = self.resolve(path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| io_error(&normalized, e))?;
        Ok(format!("Deleted {normalized}"))
    }

    async fn list(&self) -> Result<Vec<FileEntry>, FileError> {
        let mut entries = Vec::new();
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(rd) => rd,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&dir.display().to_string(), e)),
            };
            while let Some(entry) = read_dir
                .next_entry()
                .await
                .map_err(|e| io_error(&dir.display().to_string(), e))?
            {
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let path = entry.path();
                let meta = entry
                    .metadata()
                    .await
                    .map_err(|e| io_error(&path.display().to_string(), e))?;
                if meta.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.root) {
                    entries.push(FileEntry {
                        path: rel.to_string_lossy().replace('\\', "/"),
                        size: meta.len() as usize,
                    });
                }
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_read_list_delete() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());

        assert_eq!(store.write("book/one.md", "Chapter one").await.unwrap(), "Created book/one.md");
        assert_eq!(store.write("book/one.md", "Chapter 1").await.unwrap(), "Updated book/one.md");
        store.write("notes.md", "n").await.unwrap();
        std::fs::write(dir.path().join(".hidden"), "x").unwrap();

        assert_eq!(store.read("./book/one.md").await.unwrap(), "Chapter 1");
        let paths: Vec<_> = store.list().await.unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["book/one.md", "notes.md"]);

        store.delete("notes.md").await.unwrap();
        assert!(matches!(store.read("notes.md").await, Err(FileError::NotFound(_))));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());
        assert!(matches!(
            store.read("../etc/passwd").await,
            Err(FileError::InvalidPath { .. })
        ));
    }

    #[tokio::test]
    async fn rename_refuses_existing_target() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());
        store.write("a.md", "a").await.unwrap();
        store.write("b.md", "b").await.unwrap();
        assert!(matches!(store.rename("a.md", "b.md").await, Err(FileError::AlreadyExists(_))));
        store.rename("a.md", "drafts/a.md").await.unwrap();
        assert_eq!(store.read("drafts/a.md").await.unwrap(), "a");
    }
}
