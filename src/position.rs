//! Resolution of diff-tool line observations into GitLab diff positions.
//!
//! An external diff tool shows two panes. A click produces one observation per
//! pane, each a displayed line number that may follow either the old-file or
//! the new-file numbering. [`resolve`] walks the hunks of the diff between the
//! two revisions and decides which side the comment belongs to.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diff::DiffHunk;

/// The three commits that define the comparison basis of one merge request
/// version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffRefs {
    pub base_sha: String,
    pub start_sha: String,
    pub head_sha: String,
}

/// Which diff-tool pane an observation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pane {
    Current,
    Next,
}

/// Old-file (`Left`) or new-file (`Right`) line numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineObservation {
    pub file_path: String,
    /// 1-based displayed line in the pane
    pub line_number: u32,
    pub pane: Pane,
}

impl LineObservation {
    pub fn new(file_path: impl Into<String>, line_number: u32, pane: Pane) -> Self {
        Self {
            file_path: file_path.into(),
            line_number,
            pane,
        }
    }
}

/// Where a new discussion should be anchored.
///
/// Exactly one of the old/new pairs is set, unless `ambiguous` is true, in
/// which case both are set to the same observed file and line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPosition {
    pub old_path: Option<String>,
    pub old_line: Option<u32>,
    pub new_path: Option<String>,
    pub new_line: Option<u32>,
    pub ambiguous: bool,
    pub refs: DiffRefs,
}

impl ResolvedPosition {
    fn old(observation: &LineObservation, refs: DiffRefs) -> Self {
        Self {
            old_path: Some(observation.file_path.clone()),
            old_line: Some(observation.line_number),
            new_path: None,
            new_line: None,
            ambiguous: false,
            refs,
        }
    }

    fn new(observation: &LineObservation, refs: DiffRefs) -> Self {
        Self {
            old_path: None,
            old_line: None,
            new_path: Some(observation.file_path.clone()),
            new_line: Some(observation.line_number),
            ambiguous: false,
            refs,
        }
    }

    fn ambiguous(observation: &LineObservation, refs: DiffRefs) -> Self {
        Self {
            old_path: Some(observation.file_path.clone()),
            old_line: Some(observation.line_number),
            new_path: Some(observation.file_path.clone()),
            new_line: Some(observation.line_number),
            ambiguous: true,
            refs,
        }
    }
}

/// Resolve two pane observations against the hunks of the diff between the
/// compared revisions.
///
/// The first hunk that classifies either observation decides. When no hunk
/// does, the result is ambiguous and anchored at `current`, so that the
/// comment can still be placed approximately.
pub fn resolve(
    current: &LineObservation,
    next: &LineObservation,
    hunks: &[DiffHunk],
    refs: DiffRefs,
) -> ResolvedPosition {
    for hunk in hunks {
        let current_at_left = hunk.contains_left(current.line_number);
        let current_at_right = hunk.contains_right(current.line_number);
        let next_at_left = hunk.contains_left(next.line_number);
        let next_at_right = hunk.contains_right(next.line_number);

        if current_at_left {
            if next_at_right {
                return ResolvedPosition::ambiguous(current, refs);
            }
            return ResolvedPosition::old(current, refs);
        }
        if current_at_right {
            if next_at_left {
                return ResolvedPosition::ambiguous(current, refs);
            }
            return ResolvedPosition::new(current, refs);
        }
        if next_at_left {
            return ResolvedPosition::old(next, refs);
        }
        if next_at_right {
            return ResolvedPosition::new(next, refs);
        }
    }

    tracing::debug!(
        path = %current.file_path,
        line = current.line_number,
        "no hunk covers the observed lines, falling back to an ambiguous position"
    );
    ResolvedPosition::ambiguous(current, refs)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("cannot parse a path obtained from difftool: {0}")]
    NotADifftoolPath(String),
}

/// Convert a file path reported by `git difftool --dir-diff` into the
/// repository-relative path GitLab uses.
///
/// Difftool checks the two revisions out under `<temp_root>/left/` and
/// `<temp_root>/right/`. Below `temp_root` the first component must be one of
/// those; the rest is the repository path, even when it contains `left` or
/// `right` directories itself. A path outside `temp_root` is split at the
/// first side component.
pub fn difftool_relative_path(temp_root: &Path, full_path: &str) -> Result<String, PathError> {
    let normalized = full_path.replace('\\', "/");
    let root = temp_root.to_string_lossy().replace('\\', "/");
    let root = root.trim_end_matches('/');

    let relative = match normalized.strip_prefix(root) {
        Some(rest) if !root.is_empty() && rest.starts_with('/') => {
            match rest.trim_start_matches('/').split_once('/') {
                Some(("left" | "right", path)) => Some(path),
                _ => None,
            }
        }
        _ => ["/left/", "/right/"]
            .iter()
            .filter_map(|marker| normalized.find(marker).map(|idx| idx + marker.len()))
            .min()
            .map(|start| &normalized[start..]),
    };

    match relative {
        Some(path) if !path.is_empty() => Ok(path.to_string()),
        _ => Err(PathError::NotADifftoolPath(full_path.to_string())),
    }
}
