use crate::velocity::MonthlyActivity;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Whether an issue can be traced to merged-or-open code review.
///
/// Deliberately binary: an issue with commits but no pull request is still
/// `None`, there is no partial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceabilityStatus {
    Complete,
    #[serde(rename = "none")]
    Untraced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTraceability {
    pub pull_requests: Vec<u64>,
    pub commit_count: usize,
    pub lines_changed: usize,
    pub status: TraceabilityStatus,
}

impl Default for IssueTraceability {
    fn default() -> Self {
        Self {
            pull_requests: Vec::new(),
            commit_count: 0,
            lines_changed: 0,
            status: TraceabilityStatus::Untraced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: String,
    pub commits: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitActivity {
    pub total_commits: usize,
    pub by_author: IndexMap<String, usize>,
    pub by_day: IndexMap<String, usize>,
    pub peak_day: Option<DailyCount>,
    pub average_per_day: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorChanges {
    pub commits: usize,
    pub lines_added: usize,
    pub lines_deleted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChangeStats {
    pub lines_added: usize,
    pub lines_deleted: usize,
    pub net_lines: i64,
    pub files_changed: usize,
    pub by_author: IndexMap<String, AuthorChanges>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestStats {
    pub total: usize,
    pub merged: usize,
    pub open: usize,
    pub closed_unmerged: usize,
    /// Merged / total, as a fraction.
    pub merge_rate: f64,
    pub average_time_to_first_review_hours: f64,
    pub average_time_to_merge_hours: f64,
    pub average_lines_changed: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_reviews: usize,
    pub approvals: usize,
    pub changes_requested: usize,
    pub comments: usize,
    pub average_reviews_per_pr: f64,
    pub by_reviewer: IndexMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedSourceControlMetrics {
    pub commit_activity: CommitActivity,
    pub code_changes: CodeChangeStats,
    pub pull_requests: PullRequestStats,
    pub reviews: ReviewStats,
    pub traceability: IndexMap<String, IssueTraceability>,
    /// Percentage of sprint issues with complete traceability.
    pub traceability_coverage: f64,
    pub monthly_activity: Vec<MonthlyActivity>,
}
