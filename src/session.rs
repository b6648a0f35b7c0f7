//! Entry points used by the reviewer client: resolve a diff-tool click into a
//! position, render the context around a line, and post a discussion.

use thiserror::Error;

use crate::context::ContextWindow;
use crate::diff::align::{align, FullContextDiff, MAX_DIFF_CONTEXT};
use crate::diff::parse_hunks;
use crate::discussion::{DiscussionCreator, DiscussionCreatorError, PostOutcome};
use crate::git::{DiffRequest, GitError, GitRepository};
use crate::gitlab::{DiscussionNote, DiscussionServer, MergeRequestKey};
use crate::position::{resolve, DiffRefs, LineObservation, ResolvedPosition, Side};

/// Context used for the diff that position resolution reads hunks from
pub const DEFAULT_DIFF_CONTEXT: u32 = 3;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Git(#[from] GitError),
}

pub struct ReviewSession<G, S> {
    git: G,
    server: S,
    diff_context: u32,
}

impl<G, S> ReviewSession<G, S> {
    pub fn new(git: G, server: S) -> Self {
        Self {
            git,
            server,
            diff_context: DEFAULT_DIFF_CONTEXT,
        }
    }

    pub fn with_diff_context(mut self, diff_context: u32) -> Self {
        self.diff_context = diff_context;
        self
    }

    pub fn git(&self) -> &G {
        &self.git
    }

    pub fn server(&self) -> &S {
        &self.server
    }
}

impl<G: GitRepository> ReviewSession<G, ()> {
    /// A session that only reads the repository and never posts
    pub fn local(git: G) -> Self {
        Self::new(git, ())
    }
}

impl<S: DiscussionServer> ReviewSession<(), S> {
    /// A session that only talks to the server and never reads the repository
    pub fn remote(server: S) -> Self {
        Self::new((), server)
    }
}

impl<G: GitRepository, S> ReviewSession<G, S> {
    /// Resolve two diff-tool observations against the diff GitLab uses for
    /// this version (`start_sha..head_sha` of the current pane's file).
    pub async fn resolve_discussion_position(
        &self,
        current: &LineObservation,
        next: &LineObservation,
        refs: &DiffRefs,
    ) -> Result<ResolvedPosition, SessionError> {
        let request = DiffRequest::single_file(
            &refs.start_sha,
            &refs.head_sha,
            &current.file_path,
            self.diff_context,
        );
        let diff = self.git.diff(&request).await?;
        let hunks = parse_hunks(&diff);
        tracing::debug!(hunks = hunks.len(), path = %current.file_path, "resolving position");

        Ok(resolve(current, next, &hunks, refs.clone()))
    }

    /// Cut `depth` lines of context around `target_line` of `path`.
    ///
    /// `side` selects old (`start_sha`) or new (`head_sha`) numbering.
    /// `Ok(None)` means no context is available for that line.
    pub async fn render_context_window(
        &self,
        path: &str,
        refs: &DiffRefs,
        side: Side,
        target_line: u32,
        depth: usize,
    ) -> Result<Option<ContextWindow>, SessionError> {
        let Some(aligned) = self.full_context(path, refs).await? else {
            return Ok(None);
        };
        Ok(ContextWindow::around(&aligned, side, target_line, depth))
    }

    /// `None` when git printed a diff without text hunks, e.g. for a binary
    /// file.
    async fn full_context(
        &self,
        path: &str,
        refs: &DiffRefs,
    ) -> Result<Option<FullContextDiff>, SessionError> {
        let request =
            DiffRequest::single_file(&refs.start_sha, &refs.head_sha, path, MAX_DIFF_CONTEXT);
        let diff = self.git.diff(&request).await?;
        if diff.is_empty() {
            // git prints nothing for a file that did not change between the refs
            let lines = self.git.show_file(path, &refs.head_sha).await?;
            return Ok(Some(FullContextDiff::unchanged(&lines)));
        }

        let aligned = align(&diff);
        if aligned.is_empty() {
            tracing::debug!(path, "diff has no text hunks, no context available");
            return Ok(None);
        }
        Ok(Some(aligned))
    }
}

impl<G, S: DiscussionServer> ReviewSession<G, S> {
    /// Post a discussion, anchored at `position` when given, with the
    /// unanchored fallback described in [`DiscussionCreator`].
    pub async fn post_anchored_comment(
        &self,
        mr: &MergeRequestKey,
        body: &str,
        position: Option<ResolvedPosition>,
    ) -> Result<PostOutcome, DiscussionCreatorError> {
        DiscussionCreator::new(&self.server, mr.clone())
            .create_discussion(body, position)
            .await
    }

    pub async fn reply(
        &self,
        mr: &MergeRequestKey,
        discussion_id: &str,
        body: &str,
    ) -> Result<DiscussionNote, DiscussionCreatorError> {
        DiscussionCreator::new(&self.server, mr.clone())
            .create_note(discussion_id, body)
            .await
    }
}
