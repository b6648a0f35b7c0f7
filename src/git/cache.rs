use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{DiffRequest, GitError, GitRepository};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RevisionKey {
    path: String,
    git_ref: String,
}

/// Memoized git output.
///
/// Entries are keyed by the exact request, so an entry is only reused for the
/// same refs, paths and context depth. Failed operations are never stored.
#[derive(Debug, Default)]
pub struct DiffCache {
    diffs: Mutex<HashMap<DiffRequest, Arc<Vec<String>>>>,
    revisions: Mutex<HashMap<RevisionKey, Arc<Vec<String>>>>,
}

impl DiffCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diff(&self, request: &DiffRequest) -> Option<Arc<Vec<String>>> {
        self.diffs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(request)
            .cloned()
    }

    pub fn store_diff(&self, request: DiffRequest, lines: Vec<String>) -> Arc<Vec<String>> {
        let lines = Arc::new(lines);
        self.diffs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request, Arc::clone(&lines));
        lines
    }

    pub fn revision(&self, path: &str, git_ref: &str) -> Option<Arc<Vec<String>>> {
        let key = RevisionKey {
            path: path.to_string(),
            git_ref: git_ref.to_string(),
        };
        self.revisions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    pub fn store_revision(
        &self,
        path: &str,
        git_ref: &str,
        lines: Vec<String>,
    ) -> Arc<Vec<String>> {
        let key = RevisionKey {
            path: path.to_string(),
            git_ref: git_ref.to_string(),
        };
        let lines = Arc::new(lines);
        self.revisions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&lines));
        lines
    }

    pub fn clear(&self) {
        self.diffs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.revisions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// A [`GitRepository`] that answers repeated requests from a [`DiffCache`]
pub struct CachedGitRepository<R> {
    inner: R,
    cache: DiffCache,
}

impl<R: GitRepository> CachedGitRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: DiffCache::new(),
        }
    }

    pub fn cache(&self) -> &DiffCache {
        &self.cache
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: GitRepository> GitRepository for CachedGitRepository<R> {
    async fn diff(&self, request: &DiffRequest) -> Result<Vec<String>, GitError> {
        if let Some(lines) = self.cache.diff(request) {
            tracing::debug!(?request, "diff cache hit");
            return Ok(lines.as_ref().clone());
        }
        let lines = self.inner.diff(request).await?;
        Ok(self.cache.store_diff(request.clone(), lines).as_ref().clone())
    }

    async fn show_file(&self, path: &str, git_ref: &str) -> Result<Vec<String>, GitError> {
        if let Some(lines) = self.cache.revision(path, git_ref) {
            return Ok(lines.as_ref().clone());
        }
        let lines = self.inner.show_file(path, git_ref).await?;
        Ok(self
            .cache
            .store_revision(path, git_ref, lines)
            .as_ref()
            .clone())
    }
}
