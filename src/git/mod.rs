//! Access to the local clone of the reviewed project.
//!
//! The core only needs two operations: a unified diff between two revisions
//! and the content of a file at a revision. [`GitClient`] runs the `git`
//! binary; [`CachedGitRepository`] memoizes any implementation.

mod cache;

pub use cache::{CachedGitRepository, DiffCache};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git executable not found in PATH")]
    NotInstalled,

    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git {command} failed ({status}): {stderr}")]
    OperationFailed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Arguments of one `git diff` call. Also the cache key for its output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiffRequest {
    pub left_ref: String,
    pub right_ref: String,
    pub left_path: String,
    pub right_path: String,
    /// Lines of context (`-U<N>`)
    pub context: u32,
}

impl DiffRequest {
    /// Diff of one file that keeps its name across both revisions
    pub fn single_file(
        left_ref: impl Into<String>,
        right_ref: impl Into<String>,
        path: impl Into<String>,
        context: u32,
    ) -> Self {
        let path = path.into();
        Self {
            left_ref: left_ref.into(),
            right_ref: right_ref.into(),
            left_path: path.clone(),
            right_path: path,
            context,
        }
    }
}

#[async_trait]
pub trait GitRepository: Send + Sync {
    /// Unified diff lines for the request
    async fn diff(&self, request: &DiffRequest) -> Result<Vec<String>, GitError>;

    /// Lines of `path` as of `git_ref`
    async fn show_file(&self, path: &str, git_ref: &str) -> Result<Vec<String>, GitError>;
}

/// Runs `git` in a working copy
#[derive(Debug, Clone)]
pub struct GitClient {
    program: PathBuf,
    repository: PathBuf,
}

impl GitClient {
    pub fn new(repository: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("git"),
            repository: repository.into(),
        }
    }

    /// Like [`GitClient::new`], but resolves the git binary up front so a
    /// missing installation is reported before the first operation.
    pub fn discover(repository: impl Into<PathBuf>) -> Result<Self, GitError> {
        let program = which::which("git").map_err(|_| GitError::NotInstalled)?;
        Ok(Self {
            program,
            repository: repository.into(),
        })
    }

    pub fn repository(&self) -> &Path {
        &self.repository
    }

    async fn run(&self, args: &[String]) -> Result<Vec<String>, GitError> {
        tracing::debug!(?args, repository = %self.repository.display(), "running git");

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.repository)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::OperationFailed {
                command: args.first().cloned().unwrap_or_default(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_owned)
            .collect())
    }
}

#[async_trait]
impl GitRepository for GitClient {
    async fn diff(&self, request: &DiffRequest) -> Result<Vec<String>, GitError> {
        let mut args = vec![
            "diff".to_string(),
            format!("-U{}", request.context),
            request.left_ref.clone(),
            request.right_ref.clone(),
            "--".to_string(),
            request.left_path.clone(),
        ];
        if request.right_path != request.left_path {
            args.push(request.right_path.clone());
        }
        self.run(&args).await
    }

    async fn show_file(&self, path: &str, git_ref: &str) -> Result<Vec<String>, GitError> {
        self.run(&["show".to_string(), format!("{git_ref}:{path}")])
            .await
    }
}
