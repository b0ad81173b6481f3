use crate::metrics::stats::{percent, round2};
use crate::metrics::{Burndown, BurndownPoint, MetricsCalculator, SprintMetrics, TypeBreakdown};
use crate::model::{Issue, StatusCategory};
use indexmap::IndexMap;
use itertools::Itertools;

pub trait SprintAnalyzer {
    fn sprint_metrics(&self) -> SprintMetrics;
    fn burndown(&self) -> Burndown;
}

impl SprintAnalyzer for MetricsCalculator<'_> {
    fn sprint_metrics(&self) -> SprintMetrics {
        let total_issues = self.issues.len();
        let completed_issues = self.completed().count();
        let completed_story_points = self.completed_points();

        let mut by_type: IndexMap<String, TypeBreakdown> = IndexMap::new();
        for issue in self.issues {
            let entry = by_type.entry(issue.issue_type.clone()).or_default();
            entry.count += 1;
            entry.story_points += issue.points();
            if issue.is_completed(self.statuses) {
                entry.completed += 1;
            }
        }
        by_type.sort_by(|a_name, a, b_name, b| {
            b.count.cmp(&a.count).then_with(|| a_name.cmp(b_name))
        });

        let by_status = self
            .issues
            .iter()
            .counts_by(|issue| issue.category(self.statuses))
            .into_iter()
            .sorted_by_key(|(category, _)| *category)
            .collect::<IndexMap<StatusCategory, usize>>();

        SprintMetrics {
            total_issues,
            completed_issues,
            total_story_points: self.committed_points(),
            completed_story_points,
            completion_rate: round2(percent(completed_issues as f64, total_issues as f64)),
            velocity: completed_story_points,
            spillover_percentage: round2(self.spillover_percentage()),
            by_type,
            by_status,
        }
    }

    fn burndown(&self) -> Burndown {
        let Some(window) = self.sprint.window() else {
            return Burndown::default();
        };
        let total = self.committed_points();
        let start = window.since.date_naive();
        let end = window.until.date_naive();
        let last = end.min(self.as_of.date_naive());
        let span = (end - start).num_days().max(1) as f64;

        let completions = self
            .completed()
            .filter_map(|issue| {
                issue
                    .completed_at(self.statuses)
                    .map(|at| (at.date_naive(), issue.points()))
            })
            .collect::<Vec<_>>();

        let points = start
            .iter_days()
            .take_while(|date| *date <= last)
            .enumerate()
            .map(|(elapsed, date)| {
                let burned: f64 = completions
                    .iter()
                    .filter(|(done, _)| *done <= date)
                    .map(|(_, points)| points)
                    .sum();
                BurndownPoint {
                    date,
                    ideal_remaining: round2((total * (1.0 - elapsed as f64 / span)).max(0.0)),
                    actual_remaining: round2(total - burned),
                }
            })
            .collect();

        Burndown {
            total_story_points: total,
            points,
        }
    }
}

/// Σ story points of completed issues.
pub(crate) fn velocity_of(issues: &[Issue], statuses: &crate::model::StatusTable) -> f64 {
    issues
        .iter()
        .filter(|issue| issue.is_completed(statuses))
        .map(Issue::points)
        .sum()
}
