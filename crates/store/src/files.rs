//! In-memory project files — the reference [`FileStore`] for tests and
//! scratch projects.

use async_trait::async_trait;
use quill_core::error::FileError;
use quill_core::files::{FileEntry, FileStore, normalize_path};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Files kept in a sorted map. Clones share the same files.
#[derive(Clone, Default)]
pub struct InMemoryFileStore {
    files: Arc<RwLock<BTreeMap<String, String>>>,
    protected: Arc<Vec<String>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with files.
    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let map = files
            .into_iter()
            .map(|(p, c)| (p.into(), c.into()))
            .collect();
        Self {
            files: Arc::new(RwLock::new(map)),
            protected: Arc::new(Vec::new()),
        }
    }

    /// Mark paths (or directory prefixes ending in `/`) as protected.
    pub fn protect<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected = Arc::new(paths.into_iter().map(Into::into).collect());
        self
    }

    fn check_writable(&self, path: &str) -> Result<(), FileError> {
        if self.is_protected(path) {
            return Err(FileError::Protected(path.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn read(&self, path: &str) -> Result<String, FileError> {
        let path = normalize_path(path)?;
        self.files
            .read()
            .await
            .get(&path)
            .cloned()
            .ok_or(FileError::NotFound(path))
    }

    async fn write(&self, path: &str, content: &str) -> Result<String, FileError> {
        let path = normalize_path(path)?;
        self.check_writable(&path)?;
        let created = self
            .files
            .write()
            .await
            .insert(path.clone(), content.to_string())
            .is_none();
        Ok(if created {
            format!("Created {path}")
        } else {
            format!("Updated {path}")
        })
    }

    async fn rename(&self, from: &str, to: &str) -> Result<String, FileError> {
        let from = normalize_path(from)?;
        let to = normalize_path(to)?;
        self.check_writable(&from)?;
        self.check_writable(&to)?;

        let mut files = self.files.write().await;
        if files.contains_key(&to) {
            return Err(FileError::AlreadyExists(to));
        }
        let content = files.remove(&from).ok_or_else(|| FileError::NotFound(from.clone()))?;
        files.insert(to.clone(), content);
        Ok(format!("Renamed {from} to {to}"))
    }

    async fn delete(&self, path: &str) -> Result<String, FileError> {
        let path = normalize_path(path)?;
        self.check_writable(&path)?;
        match self.files.write().await.remove(&path) {
            Some(_) => Ok(format!("Deleted {path}")),
            None => Err(FileError::NotFound(path)),
        }
    }

    async fn list(&self) -> Result<Vec<FileEntry>, FileError> {
        Ok(self
            .files
            .read()
            .await
            .iter()
            .map(|(path, content)| FileEntry {
                path: path.clone(),
                size: content.len(),
            })
            .collect())
    }

    fn is_protected(&self, path: &str) -> bool {
        self.protected.iter().any(|p| {
            if p.ends_with('/') {
                path.starts_with(p.as_str())
            } else {
                path == p
            }
        })
    }
}
