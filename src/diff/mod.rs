//! Unified diff parsing.
//!
//! This module provides:
//! - Line type classification (Added, Removed, Context, Header, Meta)
//! - Hunk header parsing into old/new file line ranges
//! - Full-context alignment of two revisions (see [`align`])

pub mod align;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Represents the type of a line in a diff patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    /// Line added in the new version (starts with +)
    Added,
    /// Line removed from the old version (starts with -)
    Removed,
    /// Context line, unchanged (starts with space)
    Context,
    /// Hunk header (@@ ... @@)
    Header,
    /// Metadata lines (diff --, +++, index, etc.)
    Meta,
}

/// Classify a line and extract its content without the prefix
pub fn classify_line(line: &str) -> (LineType, &str) {
    if line.starts_with("@@") {
        (LineType::Header, line)
    } else if line.starts_with("+++")
        || line.starts_with("---")
        || line.starts_with("diff ")
        || line.starts_with("index ")
    {
        (LineType::Meta, line)
    } else if let Some(content) = line.strip_prefix('+') {
        (LineType::Added, content)
    } else if let Some(content) = line.strip_prefix('-') {
        (LineType::Removed, content)
    } else if let Some(content) = line.strip_prefix(' ') {
        (LineType::Context, content)
    } else {
        // `\ No newline at end of file`, mode lines, etc.
        (LineType::Meta, line)
    }
}

/// One hunk of a unified diff: the old-file ("left") and new-file ("right")
/// line ranges it covers.
///
/// Ranges are half-open: `[left_start, left_start + left_length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub left_start: u32,
    pub left_length: u32,
    pub right_start: u32,
    pub right_length: u32,
}

impl DiffHunk {
    /// Exclusive upper bound of the old-file range
    pub fn left_end(&self) -> u32 {
        self.left_start.saturating_add(self.left_length)
    }

    /// Exclusive upper bound of the new-file range
    pub fn right_end(&self) -> u32 {
        self.right_start.saturating_add(self.right_length)
    }

    pub fn contains_left(&self, line: u32) -> bool {
        line >= self.left_start && line < self.left_end()
    }

    pub fn contains_right(&self, line: u32) -> bool {
        line >= self.right_start && line < self.right_end()
    }
}

/// Parse a hunk header into a [`DiffHunk`].
///
/// Format: `@@ -old_start[,old_count] +new_start[,new_count] @@ [section]`.
/// An omitted count means a single-line range, so `@@ -10 +10 @@` and
/// `@@ -10,1 +10,1 @@` parse identically.
pub fn parse_hunk_header(line: &str) -> Option<DiffHunk> {
    let rest = line.strip_prefix("@@ -")?;
    let (ranges, _section) = rest.split_once(" @@")?;
    let (left, right) = ranges.split_once(" +")?;
    let (left_start, left_length) = parse_range(left)?;
    let (right_start, right_length) = parse_range(right)?;

    Some(DiffHunk {
        left_start,
        left_length,
        right_start,
        right_length,
    })
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, length)) => Some((start.parse().ok()?, length.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Build the hunk index of a unified diff.
///
/// Metadata before the first header and all content lines are skipped.
/// Headers that fail to parse are ignored; the result holds every hunk
/// that did parse, in file order.
pub fn parse_hunks<I, S>(lines: I) -> Vec<DiffHunk>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hunks = Vec::new();
    for line in lines {
        let line = line.as_ref();
        if classify_line(line).0 != LineType::Header {
            continue;
        }
        match parse_hunk_header(line) {
            Some(hunk) => hunks.push(hunk),
            None => debug!(line, "skipping malformed hunk header"),
        }
    }
    hunks
}
