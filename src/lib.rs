pub mod config;
pub mod context;
pub mod diff;
pub mod discussion;
pub mod git;
pub mod gitlab;
pub mod position;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{ContextLine, ContextWindow, LineState};
pub use diff::align::{align, FullContextDiff, MAX_DIFF_CONTEXT};
pub use diff::{classify_line, parse_hunk_header, parse_hunks, DiffHunk, LineType};
pub use discussion::{DiscussionCreator, DiscussionCreatorError, PostOutcome};
pub use position::{resolve, DiffRefs, LineObservation, Pane, ResolvedPosition, Side};
pub use session::{ReviewSession, SessionError};
