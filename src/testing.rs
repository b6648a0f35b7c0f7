//! In-memory collaborators shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::git::{DiffRequest, GitError, GitRepository};
use crate::gitlab::{
    Author, Discussion, DiscussionNote, DiscussionServer, MergeRequestKey, NotePosition,
    ServerError,
};
use crate::position::ResolvedPosition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { body: String, anchored: bool },
    List,
    Delete(u64),
    Reply(String),
}

pub fn note(id: u64, position: Option<&ResolvedPosition>) -> DiscussionNote {
    DiscussionNote {
        id,
        body: format!("note {id}"),
        author: Author {
            id: 1,
            username: "reviewer".to_string(),
            name: "Reviewer".to_string(),
        },
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        note_type: position.map(|_| "DiffNote".to_string()),
        position: position.map(|p| NotePosition {
            base_sha: p.refs.base_sha.clone(),
            start_sha: p.refs.start_sha.clone(),
            head_sha: p.refs.head_sha.clone(),
            old_path: p.old_path.clone(),
            new_path: p.new_path.clone(),
            old_line: p.old_line,
            new_line: p.new_line,
            position_type: Some("text".to_string()),
        }),
    }
}

fn status(status: u16) -> ServerError {
    ServerError::Status {
        status,
        message: "scripted failure".to_string(),
    }
}

/// Records every call; discussion creation answers from a script of
/// `Ok(())` / `Err(status)` entries.
pub struct FakeServer {
    calls: Mutex<Vec<Call>>,
    create_results: Mutex<VecDeque<Result<(), u16>>>,
    discussions: Vec<Discussion>,
    list_fails: bool,
    delete_fails: bool,
    reply_fails: bool,
}

impl FakeServer {
    pub fn new(create_results: Vec<Result<(), u16>>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            create_results: Mutex::new(create_results.into()),
            discussions: Vec::new(),
            list_fails: false,
            delete_fails: false,
            reply_fails: false,
        }
    }

    pub fn with_discussions(mut self, threads: Vec<Vec<DiscussionNote>>) -> Self {
        self.discussions = threads
            .into_iter()
            .enumerate()
            .map(|(i, notes)| Discussion {
                id: format!("d{i}"),
                individual_note: false,
                notes,
            })
            .collect();
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.list_fails = true;
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.delete_fails = true;
        self
    }

    pub fn failing_reply(mut self) -> Self {
        self.reply_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DiscussionServer for FakeServer {
    async fn create_discussion(
        &self,
        _mr: &MergeRequestKey,
        body: &str,
        position: Option<&ResolvedPosition>,
    ) -> Result<Discussion, ServerError> {
        self.record(Call::Create {
            body: body.to_string(),
            anchored: position.is_some(),
        });
        let result = self
            .create_results
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected create_discussion call");
        result.map_err(status)?;

        let mut first = note(100, position);
        first.body = body.to_string();
        Ok(Discussion {
            id: "new".to_string(),
            individual_note: false,
            notes: vec![first],
        })
    }

    async fn list_discussions(
        &self,
        _mr: &MergeRequestKey,
    ) -> Result<Vec<Discussion>, ServerError> {
        self.record(Call::List);
        if self.list_fails {
            return Err(status(503));
        }
        Ok(self.discussions.clone())
    }

    async fn delete_note(&self, _mr: &MergeRequestKey, note_id: u64) -> Result<(), ServerError> {
        self.record(Call::Delete(note_id));
        if self.delete_fails {
            return Err(status(403));
        }
        Ok(())
    }

    async fn create_note(
        &self,
        _mr: &MergeRequestKey,
        discussion_id: &str,
        body: &str,
    ) -> Result<DiscussionNote, ServerError> {
        self.record(Call::Reply(discussion_id.to_string()));
        if self.reply_fails {
            return Err(status(404));
        }
        let mut reply = note(200, None);
        reply.body = body.to_string();
        Ok(reply)
    }
}

/// Answers diff and show requests from fixed tables; unknown requests fail
/// like git does on a bad revision.
#[derive(Default)]
pub struct FakeGit {
    diffs: HashMap<DiffRequest, Vec<String>>,
    files: HashMap<(String, String), Vec<String>>,
}

impl FakeGit {
    pub fn with_diff(mut self, request: DiffRequest, text: &str) -> Self {
        self.diffs
            .insert(request, text.lines().map(str::to_owned).collect());
        self
    }

    pub fn with_file(mut self, path: &str, git_ref: &str, text: &str) -> Self {
        self.files.insert(
            (path.to_string(), git_ref.to_string()),
            text.lines().map(str::to_owned).collect(),
        );
        self
    }
}

fn bad_revision(command: &str) -> GitError {
    GitError::OperationFailed {
        command: command.to_string(),
        status: "exit status: 128".to_string(),
        stderr: "fatal: bad revision".to_string(),
    }
}

#[async_trait]
impl GitRepository for FakeGit {
    async fn diff(&self, request: &DiffRequest) -> Result<Vec<String>, GitError> {
        self.diffs
            .get(request)
            .cloned()
            .ok_or_else(|| bad_revision("diff"))
    }

    async fn show_file(&self, path: &str, git_ref: &str) -> Result<Vec<String>, GitError> {
        self.files
            .get(&(path.to_string(), git_ref.to_string()))
            .cloned()
            .ok_or_else(|| bad_revision("show"))
    }
}
