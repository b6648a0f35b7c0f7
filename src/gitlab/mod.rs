mod client;
pub mod discussion;

pub use client::GitLabClient;
pub use discussion::{Author, Discussion, DiscussionNote, NotePosition};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::position::ResolvedPosition;

/// Identifies a merge request: project id or `namespace/path`, plus its iid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestKey {
    pub project: String,
    pub iid: u64,
}

impl MergeRequestKey {
    pub fn new(project: impl Into<String>, iid: u64) -> Self {
        Self {
            project: project.into(),
            iid,
        }
    }
}

/// How a failed server call should be treated by the posting protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 400: the server's own position validation disagreed
    BadRequest,
    /// 500: the server may have committed part of the request
    InternalError,
    Other,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("GitLab returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request to GitLab failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid GitLab URL: {0}")]
    InvalidUrl(String),
}

impl ServerError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidUrl(_) => None,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self.status() {
            Some(400) => FailureKind::BadRequest,
            Some(500) => FailureKind::InternalError,
            _ => FailureKind::Other,
        }
    }
}

/// The discussion endpoints of a merge request
#[async_trait]
pub trait DiscussionServer: Send + Sync {
    async fn create_discussion(
        &self,
        mr: &MergeRequestKey,
        body: &str,
        position: Option<&ResolvedPosition>,
    ) -> Result<Discussion, ServerError>;

    async fn list_discussions(&self, mr: &MergeRequestKey) -> Result<Vec<Discussion>, ServerError>;

    async fn delete_note(&self, mr: &MergeRequestKey, note_id: u64) -> Result<(), ServerError>;

    /// Reply to an existing discussion
    async fn create_note(
        &self,
        mr: &MergeRequestKey,
        discussion_id: &str,
        body: &str,
    ) -> Result<DiscussionNote, ServerError>;
}
