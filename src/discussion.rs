//! Creation of merge request discussions.
//!
//! GitLab validates line positions on its own and can disagree with a
//! position computed from the diff tool. [`DiscussionCreator`] then falls back
//! to an unanchored discussion that names the intended location in its body.
//! When the server fails with an internal error it may already have stored
//! the anchored note, so matching notes are deleted before the fallback.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::gitlab::{
    Discussion, DiscussionNote, DiscussionServer, FailureKind, MergeRequestKey, ServerError,
};
use crate::position::ResolvedPosition;

/// Result of a successful post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// Created as requested
    Posted(Discussion),
    /// The server rejected the position; created without it
    PostedUnanchored(Discussion),
}

impl PostOutcome {
    pub fn discussion(&self) -> &Discussion {
        match self {
            Self::Posted(d) | Self::PostedUnanchored(d) => d,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::PostedUnanchored(_))
    }
}

/// Posting failed for good.
///
/// `handled` is true when a fallback was attempted and its failure has been
/// reported already, so callers should not report it again.
#[derive(Debug, Error)]
#[error("cannot create a discussion: {source}")]
pub struct DiscussionCreatorError {
    pub handled: bool,
    #[source]
    pub source: ServerError,
}

impl DiscussionCreatorError {
    fn unhandled(source: ServerError) -> Self {
        Self {
            handled: false,
            source,
        }
    }
}

/// Plain-text description of where a discussion was meant to be anchored
pub fn fallback_summary(position: &ResolvedPosition) -> String {
    fn or_na<T: ToString>(value: Option<T>) -> String {
        value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
    }

    format!(
        "{} (line {}) vs {} (line {})",
        or_na(position.old_path.as_deref()),
        or_na(position.old_line),
        or_na(position.new_path.as_deref()),
        or_na(position.new_line),
    )
}

pub struct DiscussionCreator<'a, S: ?Sized> {
    server: &'a S,
    mr: MergeRequestKey,
}

impl<'a, S: DiscussionServer + ?Sized> DiscussionCreator<'a, S> {
    pub fn new(server: &'a S, mr: MergeRequestKey) -> Self {
        Self { server, mr }
    }

    /// Reply to an existing discussion
    pub async fn create_note(
        &self,
        discussion_id: &str,
        body: &str,
    ) -> Result<DiscussionNote, DiscussionCreatorError> {
        self.server
            .create_note(&self.mr, discussion_id, body)
            .await
            .map_err(DiscussionCreatorError::unhandled)
    }

    /// Start a new discussion, anchored at `position` when one is given.
    ///
    /// A bad request with a position is retried once without it. An internal
    /// error is retried the same way after deleting any note already stored at
    /// the position. Other failures are returned as is.
    pub async fn create_discussion(
        &self,
        body: &str,
        position: Option<ResolvedPosition>,
    ) -> Result<PostOutcome, DiscussionCreatorError> {
        let err = match self
            .server
            .create_discussion(&self.mr, body, position.as_ref())
            .await
        {
            Ok(discussion) => return Ok(PostOutcome::Posted(discussion)),
            Err(err) => err,
        };
        debug!(%err, kind = ?err.kind(), "create discussion failed");

        let Some(position) = position else {
            return Err(DiscussionCreatorError::unhandled(err));
        };

        match err.kind() {
            FailureKind::BadRequest => self.create_without_position(body, &position).await,
            FailureKind::InternalError => {
                self.cleanup_bad_notes(&position).await;
                self.create_without_position(body, &position).await
            }
            FailureKind::Other => Err(DiscussionCreatorError::unhandled(err)),
        }
    }

    async fn create_without_position(
        &self,
        body: &str,
        position: &ResolvedPosition,
    ) -> Result<PostOutcome, DiscussionCreatorError> {
        info!("reporting a discussion without position (fallback)");

        let body = format!("{}\n\n{}", fallback_summary(position), body);
        match self.server.create_discussion(&self.mr, &body, None).await {
            Ok(discussion) => Ok(PostOutcome::PostedUnanchored(discussion)),
            Err(source) => {
                error!(%source, "cannot create a discussion (again)");
                Err(DiscussionCreatorError {
                    handled: true,
                    source,
                })
            }
        }
    }

    /// Delete every note stored at `position`, including one the failed
    /// request may have created. Failures are logged and skipped.
    async fn cleanup_bad_notes(&self, position: &ResolvedPosition) {
        info!("looking up notes with the rejected position");

        let discussions = match self.server.list_discussions(&self.mr).await {
            Ok(discussions) => discussions,
            Err(e) => {
                warn!(%e, "cannot list discussions, skipping cleanup");
                return;
            }
        };

        let mut deleted = 0usize;
        for note in discussions.iter().flat_map(|d| &d.notes) {
            if !note.position.as_ref().is_some_and(|p| p.matches(position)) {
                continue;
            }
            info!(
                note_id = note.id,
                author = %note.author.username,
                created_at = %note.created_at,
                body = %note.body,
                "deleting discussion note"
            );
            match self.server.delete_note(&self.mr, note.id).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!(note_id = note.id, %e, "cannot delete discussion note"),
            }
        }

        info!(deleted, "cleanup finished");
    }
}
