//! Report request, assembled report, and its renderers.

pub mod markdown;
mod orchestrator;

pub use markdown::MarkdownReport;
pub use orchestrator::SprintOrchestrator;

use crate::correlation::EnhancedSourceControlMetrics;
use crate::metrics::{
    Burndown, CapacityRecord, ForwardLooking, SprintMetrics, Tier1Metrics, Tier2Metrics,
    Tier3Metrics,
};
use crate::model::{Commit, PullRequest, RepoRef, Sprint};
use crate::velocity::{IssueTypeCount, SprintPerformance, VelocityData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optional report sections. A section is present in the [`Report`] iff its
/// flag is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportSections {
    pub include_commits: bool,
    pub include_pull_requests: bool,
    pub include_velocity: bool,
    pub include_burndown: bool,
    pub include_tier1: bool,
    pub include_tier2: bool,
    pub include_tier3: bool,
    pub include_forward_looking: bool,
    pub include_enhanced_source_control: bool,
}

impl ReportSections {
    pub fn all() -> Self {
        Self {
            include_commits: true,
            include_pull_requests: true,
            include_velocity: true,
            include_burndown: true,
            include_tier1: true,
            include_tier2: true,
            include_tier3: true,
            include_forward_looking: true,
            include_enhanced_source_control: true,
        }
    }

    /// Tier calculations need issue change history.
    pub fn needs_enhanced_issues(&self) -> bool {
        self.include_tier1
            || self.include_tier2
            || self.include_tier3
            || self.include_forward_looking
    }

    pub fn needs_commits(&self) -> bool {
        self.include_commits || self.include_enhanced_source_control
    }

    pub fn needs_pull_requests(&self) -> bool {
        self.include_pull_requests || self.include_enhanced_source_control
    }

    /// Velocity history feeds the velocity section, the forecast, and the
    /// cycle-time comparison against the previous sprint.
    pub fn needs_velocity_window(&self) -> bool {
        self.include_velocity || self.include_forward_looking || self.include_tier2
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub sprint_id: u64,
    #[serde(flatten)]
    pub sections: ReportSections,
    #[serde(default)]
    pub repo: Option<RepoRef>,
    /// Closed sprints in the velocity window; the configured default when absent.
    #[serde(default)]
    pub sprint_count: Option<usize>,
    #[serde(default)]
    pub capacity: Vec<CapacityRecord>,
    /// Fixes the instant time-relative metrics are measured at.
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

// Create
impl ReportRequest {
    pub fn new(sprint_id: u64, sections: ReportSections) -> Self {
        Self {
            sprint_id,
            sections,
            ..Self::default()
        }
    }

    pub fn with_repo(mut self, repo: RepoRef) -> Self {
        self.repo = Some(repo);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub sprint: Sprint,
    pub as_of: DateTime<Utc>,
    pub metrics: SprintMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commits: Option<Vec<Commit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_requests: Option<Vec<PullRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<VelocityData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_performance: Option<Vec<SprintPerformance>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type_distribution: Option<Vec<IssueTypeCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burndown: Option<Burndown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier1: Option<Tier1Metrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier2: Option<Tier2Metrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier3: Option<Tier3Metrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_looking: Option<ForwardLooking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_source_control: Option<EnhancedSourceControlMetrics>,
    /// Degraded fetches; empty when every requested input was loaded.
    pub warnings: Vec<String>,
}
