use crate::metrics::stats::{percent, round2};
use crate::metrics::{
    MetricsCalculator, ScopeChange, ScopeChangeKind, SpilloverAnalysis, SpilloverIssue,
    SpilloverReason, SprintGoalAnalysis, Tier1Metrics,
};
use crate::model::{Issue, Sprint, StatusCategory};
use indexmap::IndexMap;
use std::collections::HashSet;

const DEPENDENCY_LABELS: &[&str] = &["dependency", "external-dependency", "blocked-by", "waiting"];
const UNDERESTIMATED_LABELS: &[&str] = &["underestimated", "needs-split"];
const LARGE_ESTIMATE: f64 = 8.0;

pub trait Tier1Analyzer {
    fn sprint_goal_analysis(&self) -> SprintGoalAnalysis;
    fn scope_changes(&self) -> Vec<ScopeChange>;
    fn spillover_analysis(&self) -> SpilloverAnalysis;

    fn tier1(&self) -> Tier1Metrics {
        Tier1Metrics {
            sprint_goal: self.sprint_goal_analysis(),
            scope_changes: self.scope_changes(),
            spillover: self.spillover_analysis(),
        }
    }
}

impl Tier1Analyzer for MetricsCalculator<'_> {
    fn sprint_goal_analysis(&self) -> SprintGoalAnalysis {
        let total = self.committed_points();
        let completed = self.completed_points();
        let completion = if total > 0.0 {
            percent(completed, total)
        } else {
            percent(self.completed().count() as f64, self.issues.len() as f64)
        };
        let threshold = self.config.thresholds.goal_achievement_percent;

        SprintGoalAnalysis {
            goal: self.sprint.goal.clone().filter(|goal| !goal.trim().is_empty()),
            total_story_points: total,
            completed_story_points: completed,
            completion_percentage: round2(completion),
            achievement_threshold: threshold,
            achieved: !self.issues.is_empty() && completion >= threshold,
            delivered: self.completed().map(|issue| issue.key.clone()).collect(),
            missed: self.incomplete().map(|issue| issue.key.clone()).collect(),
        }
    }

    fn scope_changes(&self) -> Vec<ScopeChange> {
        let Some(window) = self.sprint.window() else {
            return Vec::new();
        };
        let mut changes = Vec::new();
        for issue in self.issues {
            let sprint_changes = issue
                .history
                .iter()
                .filter(|change| change.is_field("sprint"))
                .collect::<Vec<_>>();

            if sprint_changes.is_empty() {
                if issue.created > window.since && issue.created <= window.until {
                    changes.push(ScopeChange {
                        issue_key: issue.key.clone(),
                        kind: ScopeChangeKind::Added,
                        at: issue.created,
                        story_points_delta: issue.points(),
                        author: None,
                    });
                }
                continue;
            }

            for change in sprint_changes {
                if change.at <= window.since || change.at >= window.until {
                    continue;
                }
                let was_in = mentions_sprint(change.from.as_deref(), self.sprint);
                let is_in = mentions_sprint(change.to.as_deref(), self.sprint);
                let kind = match (was_in, is_in) {
                    (false, true) => ScopeChangeKind::Added,
                    (true, false) => ScopeChangeKind::Removed,
                    _ => continue,
                };
                let delta = match kind {
                    ScopeChangeKind::Added => issue.points(),
                    ScopeChangeKind::Removed => -issue.points(),
                };
                changes.push(ScopeChange {
                    issue_key: issue.key.clone(),
                    kind,
                    at: change.at,
                    story_points_delta: delta,
                    author: change.author.clone(),
                });
            }
        }
        changes.sort_by(|a, b| a.at.cmp(&b.at).then_with(|| a.issue_key.cmp(&b.issue_key)));
        changes
    }

    fn spillover_analysis(&self) -> SpilloverAnalysis {
        let late = self.late_additions();
        let incomplete_issues = self
            .incomplete()
            .map(|issue| SpilloverIssue {
                issue_key: issue.key.clone(),
                status: issue.status.clone(),
                story_points: issue.points(),
                reason: self.spillover_reason(issue, &late),
            })
            .collect::<Vec<_>>();

        let mut reasons: IndexMap<SpilloverReason, usize> = IndexMap::new();
        for issue in &incomplete_issues {
            *reasons.entry(issue.reason).or_default() += 1;
        }
        reasons.sort_by(|a_reason, a, b_reason, b| b.cmp(a).then_with(|| a_reason.cmp(b_reason)));

        SpilloverAnalysis {
            committed_story_points: self.committed_points(),
            incomplete_story_points: incomplete_issues.iter().map(|i| i.story_points).sum(),
            spillover_percentage: round2(self.spillover_percentage()),
            incomplete_issues,
            reasons,
        }
    }
}

// Reasons
impl MetricsCalculator<'_> {
    /// Keys of issues pulled into the sprint after it started.
    pub(crate) fn late_additions(&self) -> HashSet<String> {
        self.scope_changes()
            .into_iter()
            .filter(|change| change.kind == ScopeChangeKind::Added)
            .map(|change| change.issue_key)
            .collect()
    }

    /// Best guess at why an unfinished issue did not make it, from flags,
    /// labels, scope history and size.
    pub(crate) fn spillover_reason(
        &self,
        issue: &Issue,
        late: &HashSet<String>,
    ) -> SpilloverReason {
        let flag_mentions_dependency = issue
            .flag_reason
            .as_deref()
            .is_some_and(|reason| reason.to_lowercase().contains("depend"));

        if issue.flagged && flag_mentions_dependency {
            SpilloverReason::Dependency
        } else if issue.flagged {
            SpilloverReason::Blocked
        } else if issue.has_any_label(DEPENDENCY_LABELS) {
            SpilloverReason::Dependency
        } else if late.contains(&issue.key) {
            SpilloverReason::ScopeAddedLate
        } else if issue.has_any_label(UNDERESTIMATED_LABELS)
            || (issue.category(self.statuses) == StatusCategory::InProgress
                && issue.points() >= LARGE_ESTIMATE)
        {
            SpilloverReason::Underestimated
        } else {
            SpilloverReason::Unspecified
        }
    }
}

fn mentions_sprint(value: Option<&str>, sprint: &Sprint) -> bool {
    let id = sprint.id.to_string();
    value.is_some_and(|value| {
        value
            .split(',')
            .map(str::trim)
            .any(|name| name == sprint.name || name == id)
    })
}
