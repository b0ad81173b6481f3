use crate::model::SprintWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `owner/name` coordinates of a source-control repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl ToString, name: impl ToString) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(owner, name))
            }
            _ => Err(format!("expected `owner/name`, got `{s}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub sha: String,
    pub author: String,
    #[serde(default)]
    pub email: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub files_changed: usize,
    #[serde(default)]
    pub additions: usize,
    #[serde(default)]
    pub deletions: usize,
}

impl Commit {
    pub fn lines_changed(&self) -> usize {
        self.additions + self.deletions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub reviewer: String,
    pub state: ReviewState,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub author: String,
    #[serde(default)]
    pub source_branch: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub additions: usize,
    #[serde(default)]
    pub deletions: usize,
    #[serde(default)]
    pub commit_count: usize,
    #[serde(default)]
    pub first_review_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub linked_issues: Vec<String>,
}

impl PullRequest {
    pub fn lines_changed(&self) -> usize {
        self.additions + self.deletions
    }

    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    /// Earliest review signal: the provider's stamp, else the first submitted review.
    pub fn first_review(&self) -> Option<DateTime<Utc>> {
        self.first_review_at
            .or_else(|| self.reviews.iter().map(|r| r.submitted_at).min())
    }

    /// Whether the PR was opened, merged or closed inside `window`.
    pub fn touches(&self, window: &SprintWindow) -> bool {
        window.contains(&self.created_at)
            || window.contains_opt(&self.merged_at)
            || window.contains_opt(&self.closed_at)
    }
}
