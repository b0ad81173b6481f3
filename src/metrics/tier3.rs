use crate::metrics::stats::{percent, round2};
use crate::metrics::{
    EpicProgress, Level, MetricsCalculator, RiskItem, RiskStatus, TechnicalDebt, Tier3Metrics,
};
use crate::model::{Issue, Priority};
use indexmap::IndexMap;
use itertools::Itertools;

const TECH_DEBT_LABELS: &[&str] = &[
    "tech-debt",
    "technical-debt",
    "techdebt",
    "tech_debt",
    "refactor",
    "refactoring",
];
const TECH_DEBT_TYPES: &[&str] = &["technical debt", "tech debt"];

pub trait Tier3Analyzer {
    fn epic_progress(&self) -> Vec<EpicProgress>;
    fn technical_debt(&self) -> TechnicalDebt;
    fn risks(&self) -> Vec<RiskItem>;

    fn tier3(&self) -> Tier3Metrics {
        Tier3Metrics {
            epic_progress: self.epic_progress(),
            technical_debt: self.technical_debt(),
            risks: self.risks(),
        }
    }
}

fn is_tech_debt(issue: &Issue) -> bool {
    issue.has_any_label(TECH_DEBT_LABELS)
        || TECH_DEBT_TYPES.iter().any(|kind| issue.is_type(kind))
}

impl Tier3Analyzer for MetricsCalculator<'_> {
    fn epic_progress(&self) -> Vec<EpicProgress> {
        let mut epics: IndexMap<String, EpicProgress> = IndexMap::new();
        for issue in self.issues {
            let Some(epic) = &issue.epic else {
                continue;
            };
            let progress = epics
                .entry(epic.key.clone())
                .or_insert_with(|| EpicProgress {
                    epic_key: epic.key.clone(),
                    epic_name: epic.name.clone(),
                    ..EpicProgress::default()
                });
            progress.total_issues += 1;
            progress.total_story_points += issue.points();
            if issue.is_completed(self.statuses) {
                progress.completed_issues += 1;
                progress.completed_story_points += issue.points();
            }
        }

        epics
            .into_values()
            .map(|mut progress| {
                progress.remaining_issues = progress.total_issues - progress.completed_issues;
                progress.remaining_story_points =
                    progress.total_story_points - progress.completed_story_points;
                progress.completion_percentage = round2(if progress.total_story_points > 0.0 {
                    percent(progress.completed_story_points, progress.total_story_points)
                } else {
                    percent(progress.completed_issues as f64, progress.total_issues as f64)
                });
                progress
            })
            .sorted_by(|a, b| a.epic_key.cmp(&b.epic_key))
            .collect()
    }

    fn technical_debt(&self) -> TechnicalDebt {
        let window = self.sprint.window();
        let debt = self
            .issues
            .iter()
            .filter(|issue| is_tech_debt(issue))
            .collect::<Vec<_>>();
        let added = debt
            .iter()
            .filter(|issue| window.map_or(true, |w| w.contains(&issue.created)))
            .count();
        let addressed = debt
            .iter()
            .filter(|issue| {
                let done = issue.completed_at(self.statuses);
                done.is_some() && window.map_or(true, |w| w.contains_opt(&done))
            })
            .count();

        TechnicalDebt {
            total_items: debt.len(),
            total_story_points: debt.iter().map(|issue| issue.points()).sum(),
            added,
            addressed,
            net_tech_debt_change: added as i64 - addressed as i64,
            items: debt.iter().map(|issue| issue.key.clone()).collect(),
        }
    }

    fn risks(&self) -> Vec<RiskItem> {
        let thresholds = &self.config.thresholds;
        let sprint_over = self
            .sprint
            .end_date
            .is_some_and(|end| self.as_of >= end);

        self.issues
            .iter()
            .filter(|issue| issue.flagged)
            .filter_map(|issue| issue.priority().filter(Priority::is_high).map(|p| (issue, p)))
            .map(|(issue, priority)| {
                let flagged = issue.flagged_since().unwrap_or(issue.created);
                let days_flagged = (self.as_of - flagged).num_days().max(0);
                let probability = if days_flagged >= thresholds.blocker_high_days {
                    Level::High
                } else if days_flagged >= thresholds.blocker_medium_days {
                    Level::Medium
                } else {
                    Level::Low
                };
                let impact = if priority >= Priority::Critical {
                    Level::High
                } else {
                    Level::Medium
                };
                let status = if issue.is_completed(self.statuses) {
                    RiskStatus::Mitigated
                } else if sprint_over {
                    RiskStatus::Occurred
                } else {
                    RiskStatus::Active
                };
                RiskItem {
                    issue_key: issue.key.clone(),
                    summary: issue.summary.clone(),
                    probability,
                    impact,
                    score: probability.weight() * impact.weight(),
                    days_flagged,
                    status,
                }
            })
            .sorted_by(|a, b| b.score.cmp(&a.score).then_with(|| a.issue_key.cmp(&b.issue_key)))
            .collect()
    }
}
