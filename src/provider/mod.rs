//! Issue-tracker and source-control data seam.

mod git;
mod snapshot;

pub use git::GitHistory;
pub use snapshot::SnapshotProvider;

use crate::error::ProviderResult;
use crate::model::{Commit, Issue, PullRequest, RepoRef, Sprint, SprintWindow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much detail a fetch carries.
///
/// `Basic` issues have no change history; `Basic` pull requests have no review
/// timing and no linked-issue extraction. `Enhanced` adds both at a higher
/// fetch cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchLevel {
    Basic,
    Enhanced,
}

impl fmt::Display for FetchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchLevel::Basic => write!(f, "basic"),
            FetchLevel::Enhanced => write!(f, "enhanced"),
        }
    }
}

/// Remote data source. Retry and rate limiting are the implementor's concern.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Sprint detail, including the cheap embedded issue list.
    async fn sprint(&self, sprint_id: u64) -> ProviderResult<Sprint>;

    async fn issues(&self, sprint_id: u64, level: FetchLevel) -> ProviderResult<Vec<Issue>>;

    /// Closed sprints of a board, in any order, without embedded issues.
    async fn closed_sprints(&self, board_id: u64) -> ProviderResult<Vec<Sprint>>;

    async fn commits(&self, repo: &RepoRef, window: SprintWindow) -> ProviderResult<Vec<Commit>>;

    async fn pull_requests(
        &self,
        repo: &RepoRef,
        window: SprintWindow,
        level: FetchLevel,
    ) -> ProviderResult<Vec<PullRequest>>;
}
