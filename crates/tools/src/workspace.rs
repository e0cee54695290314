//! Shadow view of the project — committed files overlaid with unapproved
//! changes.
//!
//! Every tool reads through this view, so a file written earlier in the turn
//! is visible to later reads before the user has approved it.

use quill_core::error::FileError;
use quill_core::files::{FileStore, normalize_path};
use quill_core::session::PendingChange;
use std::collections::BTreeMap;

/// How a listed file relates to the committed project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowState {
    Committed,
    PendingCreate,
    PendingEdit,
    PendingDelete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowEntry {
    pub path: String,
    pub size: usize,
    pub state: ShadowState,
}

pub struct ShadowView<'a> {
    files: &'a dyn FileStore,
    pending: &'a [PendingChange],
}

impl<'a> ShadowView<'a> {
    pub fn new(files: &'a dyn FileStore, pending: &'a [PendingChange]) -> Self {
        Self { files, pending }
    }

    /// The newest unapproved change for `path`, if any.
    pub fn latest_pending(&self, path: &str) -> Option<&'a PendingChange> {
        self.pending
            .iter()
            .rev()
            .find(|c| normalize_path(&c.file_path).ok().as_deref() == Some(path))
    }

    pub fn has_pending(&self, path: &str) -> bool {
        self.latest_pending(path).is_some()
    }

    /// Read `path` as the user will see it once everything is approved.
    pub async fn read(&self, path: &str) -> Result<String, FileError> {
        let path = normalize_path(path)?;
        match self.latest_pending(&path) {
            Some(change) => change
                .new_content
                .clone()
                .ok_or(FileError::NotFound(path)),
            None => self.files.read(&path).await,
        }
    }

    /// Committed content only. `None` when the file does not exist yet.
    pub async fn committed(&self, path: &str) -> Result<Option<String>, FileError> {
        match self.files.read(path).await {
            Ok(content) => Ok(Some(content)),
            Err(FileError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn exists(&self, path: &str) -> Result<bool, FileError> {
        match self.read(path).await {
            Ok(_) => Ok(true),
            Err(FileError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// All files with pending changes applied, sorted by path. Pending
    /// deletions are kept so the model can see them.
    pub async fn list(&self) -> Result<Vec<ShadowEntry>, FileError> {
        let mut entries: BTreeMap<String, ShadowEntry> = self
            .files
            .list()
            .await?
            .into_iter()
            .map(|f| {
                (
                    f.path.clone(),
                    ShadowEntry {
                        path: f.path,
                        size: f.size,
                        state: ShadowState::Committed,
                    },
                )
            })
            .collect();

        for change in self.pending {
            let Ok(path) = normalize_path(&change.file_path) else {
                continue;
            };
            let committed = entries
                .get(&path)
                .map(|e| e.state != ShadowState::PendingCreate)
                .unwrap_or(false);
            let entry = match &change.new_content {
                Some(content) => ShadowEntry {
                    path: path.clone(),
                    size: content.len(),
                    state: if committed {
                        ShadowState::PendingEdit
                    } else {
                        ShadowState::PendingCreate
                    },
                },
                None => ShadowEntry {
                    path: path.clone(),
                    size: 0,
                    state: ShadowState::PendingDelete,
                },
            };
            entries.insert(path, entry);
        }

        Ok(entries.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_store::InMemoryFileStore;

    fn change(path: &str, original: Option<&str>, new: Option<&str>) -> PendingChange {
        PendingChange::new(
            "write_file",
            serde_json::json!({}),
            path,
            original.map(String::from),
            new.map(String::from),
            "test",
        )
    }

    #[tokio::test]
    async fn pending_content_shadows_committed() {
        let files = InMemoryFileStore::with_files([("a.md", "old")]);
        let pending = vec![change("a.md", Some("old"), Some("mid")), change("./a.md", Some("old"), Some("new"))];
        let view = ShadowView::new(&files, &pending);
        assert_eq!(view.read("a.md").await.unwrap(), "new");
        assert_eq!(view.committed("a.md").await.unwrap().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn pending_delete_hides_file() {
        let files = InMemoryFileStore::with_files([("a.md", "old")]);
        let pending = vec![change("a.md", Some("old"), None)];
        let view = ShadowView::new(&files, &pending);
        assert!(matches!(view.read("a.md").await, Err(FileError::NotFound(_))));
        assert!(!view.exists("a.md").await.unwrap());
    }

    #[tokio::test]
    async fn list_marks_pending_states() {
        let files = InMemoryFileStore::with_files([("a.md", "aaa"), ("b.md", "b"), ("c.md", "c")]);
        let pending = vec![
            change("a.md", Some("aaa"), Some("a")),
            change("b.md", Some("b"), None),
            change("new.md", None, Some("fresh")),
        ];
        let view = ShadowView::new(&files, &pending);
        let states: Vec<_> = view
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.path, e.state))
            .collect();
        assert_eq!(
            states,
            vec![
                ("a.md".to_string(), ShadowState::PendingEdit),
                ("b.md".to_string(), ShadowState::PendingDelete),
                ("c.md".to_string(), ShadowState::Committed),
                ("new.md".to_string(), ShadowState::PendingCreate),
            ]
        );
    }
}
