//! Human-readable context around a commented line.
//!
//! A [`ContextWindow`] is cut out of a [`FullContextDiff`] around one target
//! line, so that a reviewer sees what the discussion refers to, including
//! nearby insertions and deletions.

use std::fmt::Write as _;

use serde::Serialize;

use crate::diff::align::FullContextDiff;
use crate::position::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineState {
    Unchanged,
    Added,
    Removed,
}

/// One aligned row of a context window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextLine {
    pub left_line_number: Option<u32>,
    pub left_text: Option<String>,
    pub right_line_number: Option<u32>,
    pub right_text: Option<String>,
    pub state: LineState,
}

impl ContextLine {
    fn line_number(&self, side: Side) -> Option<u32> {
        match side {
            Side::Left => self.left_line_number,
            Side::Right => self.right_line_number,
        }
    }

    /// Text to display for the row (new side wins for unchanged lines)
    pub fn text(&self) -> &str {
        self.right_text
            .as_deref()
            .or(self.left_text.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextWindow {
    lines: Vec<ContextLine>,
    selected_index: usize,
}

impl ContextWindow {
    /// Cut a window of `depth` lines above and below `target_line`.
    ///
    /// `side` tells which numbering `target_line` uses. Only rows carrying a
    /// line on that side count toward `depth`; gap rows between them are kept.
    /// Returns `None` when the target line is not part of the revision.
    pub fn around(
        aligned: &FullContextDiff,
        side: Side,
        target_line: u32,
        depth: usize,
    ) -> Option<Self> {
        let rows = number_rows(aligned);
        let selected = rows
            .iter()
            .position(|row| row.line_number(side) == Some(target_line))?;

        let mut start = selected;
        let mut taken = 0;
        while start > 0 && taken < depth {
            start -= 1;
            if rows[start].line_number(side).is_some() {
                taken += 1;
            }
        }

        let mut end = selected;
        taken = 0;
        while end + 1 < rows.len() && taken < depth {
            end += 1;
            if rows[end].line_number(side).is_some() {
                taken += 1;
            }
        }

        let lines = rows.into_iter().skip(start).take(end - start + 1).collect();
        Some(Self {
            lines,
            selected_index: selected - start,
        })
    }

    pub fn lines(&self) -> &[ContextLine] {
        &self.lines
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContextLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn selected(&self) -> &ContextLine {
        &self.lines[self.selected_index]
    }
}

impl<'a> IntoIterator for &'a ContextWindow {
    type Item = &'a ContextLine;
    type IntoIter = std::slice::Iter<'a, ContextLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn number_rows(aligned: &FullContextDiff) -> Vec<ContextLine> {
    let mut left_number = 0u32;
    let mut right_number = 0u32;

    aligned
        .left
        .iter()
        .zip(&aligned.right)
        .map(|(left, right)| {
            let left_line_number = left.as_ref().map(|_| {
                left_number += 1;
                left_number
            });
            let right_line_number = right.as_ref().map(|_| {
                right_number += 1;
                right_number
            });
            let state = match (left, right) {
                (Some(_), None) => LineState::Removed,
                (None, Some(_)) => LineState::Added,
                _ => LineState::Unchanged,
            };
            ContextLine {
                left_line_number,
                left_text: left.clone(),
                right_line_number,
                right_text: right.clone(),
                state,
            }
        })
        .collect()
}

/// Render a window as a plain-text table: old number, new number, change
/// marker and text. The selected row is marked with `>` unless it is the only
/// row.
pub fn render_plain(window: &ContextWindow) -> String {
    let highlight = window.len() > 1;
    let mut out = String::new();

    for (index, line) in window.iter().enumerate() {
        let selected = if highlight && index == window.selected_index() {
            '>'
        } else {
            '|'
        };
        let marker = match line.state {
            LineState::Unchanged => ' ',
            LineState::Added => '+',
            LineState::Removed => '-',
        };
        let left = line
            .left_line_number
            .map(|n| n.to_string())
            .unwrap_or_default();
        let right = line
            .right_line_number
            .map(|n| n.to_string())
            .unwrap_or_default();

        let row = format!("{selected}{left:>5}{right:>5} {marker} {}", line.text());
        let _ = writeln!(out, "{}", row.trim_end());
    }

    out
}
