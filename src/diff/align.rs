//! Full-context alignment of two file revisions.
//!
//! Given a maximal-context unified diff (every line of both revisions is
//! inside a single hunk), [`align`] builds two index-aligned sequences: one row
//! per output line, with `None` where a line exists on one side only.

use serde::Serialize;
use tracing::warn;

/// Context passed to `git diff -U<N>` to get every line of both revisions.
pub const MAX_DIFF_CONTEXT: u32 = 20000;

/// Two equal-length sparse sequences. `left[i]` and `right[i]` describe the
/// same output row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FullContextDiff {
    pub left: Vec<Option<String>>,
    pub right: Vec<Option<String>>,
}

impl FullContextDiff {
    /// Alignment of a revision with itself: every row present on both sides
    pub fn unchanged<S: AsRef<str>>(lines: &[S]) -> Self {
        let rows: Vec<Option<String>> = lines
            .iter()
            .map(|line| Some(line.as_ref().to_owned()))
            .collect();
        Self {
            left: rows.clone(),
            right: rows,
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    fn push(&mut self, left: Option<&str>, right: Option<&str>) {
        self.left.push(left.map(str::to_owned));
        self.right.push(right.map(str::to_owned));
    }
}

/// Align two revisions from the full-context diff between them.
///
/// Lines before the first `@@` marker are skipped. An empty diff yields an
/// empty result and a warning; callers treat that as "no context".
pub fn align<I, S>(diff_lines: I) -> FullContextDiff
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut aligned = FullContextDiff::default();
    let mut in_hunk = false;
    let mut saw_any = false;

    for line in diff_lines {
        let line = line.as_ref();
        saw_any = true;

        if !in_hunk {
            in_hunk = line.starts_with('@');
            continue;
        }

        // Sign-based on purpose: inside a hunk `---x` is a removed `--x`.
        match line.as_bytes().first() {
            Some(b'-') => aligned.push(Some(&line[1..]), None),
            Some(b'+') => aligned.push(None, Some(&line[1..])),
            Some(b' ') => aligned.push(Some(&line[1..]), Some(&line[1..])),
            // whitespace-stripped blank context line
            None => aligned.push(Some(""), Some("")),
            // `\ No newline at end of file`, further `@@` markers
            Some(_) => {}
        }
    }

    if !saw_any {
        warn!("full-context diff is empty, no context available");
    }

    aligned
}
