use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::position::ResolvedPosition;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: String,
}

/// Position of a diff note as reported by GitLab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePosition {
    pub base_sha: String,
    pub start_sha: String,
    pub head_sha: String,
    #[serde(default)]
    pub old_path: Option<String>,
    #[serde(default)]
    pub new_path: Option<String>,
    #[serde(default)]
    pub old_line: Option<u32>,
    #[serde(default)]
    pub new_line: Option<u32>,
    #[serde(default)]
    pub position_type: Option<String>,
}

impl NotePosition {
    /// Field-wise equality with a position that was sent to the server.
    ///
    /// All commits, both paths and both lines must match exactly; a looser
    /// match could select an unrelated note.
    pub fn matches(&self, sent: &ResolvedPosition) -> bool {
        self.base_sha == sent.refs.base_sha
            && self.head_sha == sent.refs.head_sha
            && self.start_sha == sent.refs.start_sha
            && self.old_line == sent.old_line
            && self.old_path == sent.old_path
            && self.new_line == sent.new_line
            && self.new_path == sent.new_path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionNote {
    pub id: u64,
    pub body: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    #[serde(default, rename = "type")]
    pub note_type: Option<String>,
    #[serde(default)]
    pub position: Option<NotePosition>,
}

/// A thread of notes; the first note carries the position, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: String,
    #[serde(default)]
    pub individual_note: bool,
    pub notes: Vec<DiscussionNote>,
}

impl Discussion {
    pub fn first_note(&self) -> Option<&DiscussionNote> {
        self.notes.first()
    }
}
