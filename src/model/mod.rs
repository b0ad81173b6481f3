mod issue;
mod sprint;
mod source_control;
mod status;

pub use issue::{EpicLink, Issue, IssueChange, Priority};
pub use source_control::{Commit, PullRequest, RepoRef, Review, ReviewState};
pub use sprint::{Sprint, SprintState, SprintWindow};
pub use status::{StatusCategory, StatusTable};
