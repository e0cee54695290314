//! Approval workflow — resolves pending changes outside the turn.
//!
//! Approving commits the proposed content (or deletes the file) and removes
//! the entry; rejecting only removes it. Both are no-ops for an id that is
//! no longer queued. Each resolution leaves an approval-result message in
//! the session, which arms the reasoning gate for the next turn.

use std::sync::Arc;

use quill_core::error::{Error, FileError};
use quill_core::files::FileStore;
use quill_core::message::{Message, SystemKind};
use quill_core::session::{PendingChange, SessionId};
use tracing::{debug, info};

use crate::session::SessionBridge;

/// What happened to a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Approved { change_id: String, summary: String },
    Rejected { change_id: String },
    /// The id was not queued.
    Missing,
}

pub struct ApprovalWorkflow {
    bridge: SessionBridge,
    files: Arc<dyn FileStore>,
}

impl ApprovalWorkflow {
    pub fn new(bridge: SessionBridge, files: Arc<dyn FileStore>) -> Self {
        Self { bridge, files }
    }

    /// Commit a change to the project.
    async fn commit(&self, change: &PendingChange) -> Result<String, FileError> {
        match &change.new_content {
            Some(content) => self.files.write(&change.file_path, content).await,
            None => match self.files.delete(&change.file_path).await {
                Err(FileError::NotFound(path)) => Ok(format!("{path} was already absent")),
                other => other,
            },
        }
    }

    pub async fn approve(&self, session_id: &SessionId, change_id: &str) -> Result<Resolution, Error> {
        let Some(change) = self.bridge.take_pending(change_id).await else {
            debug!(change_id, "Approve ignored: change is not queued");
            return Ok(Resolution::Missing);
        };

        let summary = match self.commit(&change).await {
            Ok(summary) => summary,
            Err(e) => {
                self.bridge.restore_pending(change).await;
                return Err(e.into());
            }
        };
        info!(change_id, path = %change.file_path, "Change approved");

        self.bridge
            .append_message(
                session_id,
                Message::system(
                    SystemKind::ApprovalResult,
                    format!("Approved: {} ({summary})", change.description),
                ),
            )
            .await?;
        Ok(Resolution::Approved {
            change_id: change.id,
            summary,
        })
    }

    pub async fn reject(&self, session_id: &SessionId, change_id: &str) -> Result<Resolution, Error> {
        let Some(change) = self.bridge.take_pending(change_id).await else {
            debug!(change_id, "Reject ignored: change is not queued");
            return Ok(Resolution::Missing);
        };
        info!(change_id, path = %change.file_path, "Change rejected");

        self.bridge
            .append_message(
                session_id,
                Message::system(
                    SystemKind::ApprovalResult,
                    format!("Rejected: {}", change.description),
                ),
            )
            .await?;
        Ok(Resolution::Rejected {
            change_id: change.id,
        })
    }

    /// Approve every queued change, oldest first. Stops at the first commit
    /// failure; that change and the rest stay queued.
    pub async fn approve_all(&self, session_id: &SessionId) -> Result<Vec<Resolution>, Error> {
        let ids: Vec<String> = self
            .bridge
            .pending_changes()
            .await
            .into_iter()
            .map(|c| c.id)
            .collect();
        let mut resolutions = Vec::with_capacity(ids.len());
        for id in ids {
            resolutions.push(self.approve(session_id, &id).await?);
        }
        Ok(resolutions)
    }

    /// Reject every queued change in one step, oldest first.
    pub async fn reject_all(&self, session_id: &SessionId) -> Result<Vec<Resolution>, Error> {
        let changes = self.bridge.take_all_pending().await;
        let mut resolutions = Vec::with_capacity(changes.len());
        for change in changes {
            info!(change_id = %change.id, path = %change.file_path, "Change rejected");
            self.bridge
                .append_message(
                    session_id,
                    Message::system(
                        SystemKind::ApprovalResult,
                        format!("Rejected: {}", change.description),
                    ),
                )
                .await?;
            resolutions.push(Resolution::Rejected {
                change_id: change.id,
            });
        }
        Ok(resolutions)
    }
}
