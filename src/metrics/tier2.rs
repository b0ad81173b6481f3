use crate::metrics::stats::{days_between, hours_between, mean, median, percent, percentile, round2};
use crate::metrics::{
    AdjustmentKind, BlockerImpediment, BugMetrics, CapacityLoss, CapacityRecord, CycleTimeGroup,
    CycleTimeMetrics, Level, MemberCapacity, MetricsCalculator, TeamCapacity, Tier2Metrics,
};
use crate::model::{Issue, Priority, StatusTable};
use chrono::Datelike;
use chrono::Weekday;
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::BTreeMap;

pub trait Tier2Analyzer {
    fn blockers(&self) -> Vec<BlockerImpediment>;
    fn bug_metrics(&self) -> BugMetrics;
    /// `previous` is the cycle-time sample (days) of the preceding sprint.
    fn cycle_time(&self, previous: Option<&[f64]>) -> CycleTimeMetrics;
    fn team_capacity(&self, records: &[CapacityRecord]) -> TeamCapacity;

    fn tier2(&self, previous: Option<&[f64]>, records: &[CapacityRecord]) -> Tier2Metrics {
        Tier2Metrics {
            blockers: self.blockers(),
            bug_metrics: self.bug_metrics(),
            cycle_time: self.cycle_time(previous),
            team_capacity: self.team_capacity(records),
        }
    }
}

/// Per-issue cycle time in days for every completed issue: completion minus
/// first in-progress transition (creation date when there is none).
pub fn cycle_times(issues: &[Issue], statuses: &StatusTable) -> Vec<f64> {
    issues
        .iter()
        .filter_map(|issue| cycle_time_of(issue, statuses))
        .collect()
}

fn cycle_time_of(issue: &Issue, statuses: &StatusTable) -> Option<f64> {
    let done = issue.completed_at(statuses)?;
    Some(days_between(issue.started_at(statuses), done).max(0.0))
}

fn group(samples: Vec<(String, f64)>) -> IndexMap<String, CycleTimeGroup> {
    samples
        .into_iter()
        .into_group_map()
        .into_iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(name, values)| {
            let summary = CycleTimeGroup {
                count: values.len(),
                average_days: round2(mean(&values)),
                median_days: round2(median(&values)),
            };
            (name, summary)
        })
        .collect()
}

impl Tier2Analyzer for MetricsCalculator<'_> {
    fn blockers(&self) -> Vec<BlockerImpediment> {
        let thresholds = &self.config.thresholds;
        self.issues
            .iter()
            .filter(|issue| issue.flagged)
            .map(|issue| {
                let since = issue.flagged_since().unwrap_or(issue.created);
                let until = issue.completed_at(self.statuses).unwrap_or(self.as_of);
                let days_blocked = (until - since).num_days().max(0);
                let high_priority = issue.priority().is_some_and(|p| p.is_high());
                let impact = if days_blocked >= thresholds.blocker_high_days
                    || (high_priority && days_blocked >= thresholds.blocker_medium_days)
                {
                    Level::High
                } else if days_blocked >= thresholds.blocker_medium_days || high_priority {
                    Level::Medium
                } else {
                    Level::Low
                };
                BlockerImpediment {
                    issue_key: issue.key.clone(),
                    summary: issue.summary.clone(),
                    reason: issue.flag_reason.clone(),
                    flagged_at: issue.flagged_since(),
                    days_blocked,
                    priority: issue.priority.clone(),
                    impact,
                    resolved: issue.is_completed(self.statuses),
                }
            })
            .sorted_by(|a, b| {
                b.days_blocked
                    .cmp(&a.days_blocked)
                    .then_with(|| a.issue_key.cmp(&b.issue_key))
            })
            .collect()
    }

    fn bug_metrics(&self) -> BugMetrics {
        let window = self.sprint.window();
        let bugs = self
            .issues
            .iter()
            .filter(|issue| issue.is_type("bug"))
            .collect::<Vec<_>>();
        if bugs.is_empty() {
            return BugMetrics::default();
        }

        let created = bugs
            .iter()
            .filter(|bug| window.map_or(true, |w| w.contains(&bug.created)))
            .count();
        let resolved = bugs
            .iter()
            .filter_map(|bug| bug.completed_at(self.statuses).map(|at| (bug, at)))
            .filter(|(_, at)| window.map_or(true, |w| w.contains(at)))
            .collect::<Vec<_>>();
        let resolution_hours = resolved
            .iter()
            .map(|(bug, at)| hours_between(bug.created, *at).max(0.0))
            .collect::<Vec<_>>();
        let open = bugs
            .iter()
            .filter(|bug| !bug.is_completed(self.statuses))
            .collect::<Vec<_>>();
        let critical = open
            .iter()
            .filter(|bug| matches!(bug.priority(), Some(Priority::Critical | Priority::Blocker)))
            .count();
        let by_priority = bugs
            .iter()
            .counts_by(|bug| bug.priority.clone().unwrap_or_else(|| "Unset".to_string()))
            .into_iter()
            .sorted_by(|(a_name, a), (b_name, b)| b.cmp(a).then_with(|| a_name.cmp(b_name)))
            .collect();

        BugMetrics {
            bugs_created: created,
            bugs_resolved: resolved.len(),
            net_bug_change: created as i64 - resolved.len() as i64,
            average_resolution_time_hours: round2(mean(&resolution_hours)),
            critical_bugs_outstanding: critical,
            open_bugs: open.len(),
            by_priority,
        }
    }

    fn cycle_time(&self, previous: Option<&[f64]>) -> CycleTimeMetrics {
        let samples = self
            .issues
            .iter()
            .filter_map(|issue| cycle_time_of(issue, self.statuses).map(|days| (issue, days)))
            .collect::<Vec<_>>();
        if samples.is_empty() {
            return CycleTimeMetrics::default();
        }
        let values = samples.iter().map(|(_, days)| *days).collect::<Vec<_>>();
        let average = mean(&values);

        let improvement_percentage = previous
            .filter(|previous| !previous.is_empty())
            .map(|previous| mean(previous))
            .filter(|previous_average| *previous_average > 0.0)
            .map(|previous_average| round2(percent(previous_average - average, previous_average)));

        CycleTimeMetrics {
            sample_size: values.len(),
            average_days: round2(average),
            median_days: round2(median(&values)),
            p90_days: round2(percentile(&values, 0.9)),
            by_type: group(
                samples
                    .iter()
                    .map(|(issue, days)| (issue.issue_type.clone(), *days))
                    .collect(),
            ),
            by_priority: group(
                samples
                    .iter()
                    .map(|(issue, days)| {
                        let priority =
                            issue.priority.clone().unwrap_or_else(|| "Unset".to_string());
                        (priority, *days)
                    })
                    .collect(),
            ),
            improvement_percentage,
        }
    }

    fn team_capacity(&self, records: &[CapacityRecord]) -> TeamCapacity {
        let working_days = self.sprint.window().map_or(0, |window| {
            window
                .since
                .date_naive()
                .iter_days()
                .take_while(|date| *date <= window.until.date_naive())
                .filter(|date| !matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
                .count() as i64
        });
        let default_hours = working_days as f64 * self.config.capacity.hours_per_day;

        let mut members: BTreeMap<String, MemberCapacity> = BTreeMap::new();
        for issue in self.issues {
            let Some(assignee) = &issue.assignee else {
                continue;
            };
            let member = members.entry(assignee.clone()).or_default();
            member.assigned_story_points += issue.points();
            if issue.is_completed(self.statuses) {
                member.completed_story_points += issue.points();
            }
        }
        for record in records {
            members.entry(record.assignee.clone()).or_default();
        }

        let mut loss = CapacityLoss::default();
        let members = members
            .into_iter()
            .map(|(assignee, mut member)| {
                let record = records.iter().find(|record| record.assignee == assignee);
                let planned = record
                    .and_then(|record| record.planned_hours)
                    .unwrap_or(default_hours);
                let mut lost = 0.0;
                for adjustment in record.map(|r| r.adjustments.as_slice()).unwrap_or_default() {
                    lost += adjustment.hours;
                    match adjustment.kind {
                        AdjustmentKind::Pto => loss.pto_hours += adjustment.hours,
                        AdjustmentKind::Meetings => loss.meeting_hours += adjustment.hours,
                        AdjustmentKind::Sick => loss.sick_hours += adjustment.hours,
                        AdjustmentKind::Other => loss.other_hours += adjustment.hours,
                    }
                }
                member.assignee = assignee;
                member.planned_hours = planned;
                member.actual_hours = (planned - lost).max(0.0);
                member.utilization_percentage = round2(percent(member.actual_hours, planned));
                member
            })
            .collect::<Vec<_>>();

        let total_planned_hours = members.iter().map(|m| m.planned_hours).sum::<f64>();
        let total_actual_hours = members.iter().map(|m| m.actual_hours).sum::<f64>();
        TeamCapacity {
            working_days,
            utilization_percentage: round2(percent(total_actual_hours, total_planned_hours)),
            members,
            total_planned_hours,
            total_actual_hours,
            capacity_loss: loss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::*;
    use crate::metrics::CapacityAdjustment;
    use crate::model::IssueChange;

    #[test]
    fn test_blocker_impact() {
        let sprint = sprint();
        let mut long = issue("A-1", "Story", "In Progress", 3.0);
        long.flagged = true;
        long.flagged_at = Some(day(2));
        let mut urgent = issue("A-2", "Story", "In Progress", 3.0);
        urgent.flagged = true;
        urgent.flagged_at = Some(day(12));
        urgent.priority = Some("Highest".to_string());
        let mut fresh = issue("A-3", "Story", "In Progress", 3.0);
        fresh.flagged = true;
        fresh.flagged_at = Some(day(13));
        let issues = vec![fresh, urgent, long, issue("A-4", "Story", "Done", 1.0)];
        let (statuses, config) = (statuses(), config());
        let calc = MetricsCalculator::new(&sprint, &issues, &statuses, &config, day(14));

        let blockers = calc.blockers();
        assert_eq!(blockers.len(), 3);
        assert_eq!(blockers[0].issue_key, "A-1");
        assert_eq!(blockers[0].days_blocked, 12);
        assert_eq!(blockers[0].impact, Level::High);
        assert_eq!(blockers[1].impact, Level::Medium);
        assert_eq!(blockers[2].impact, Level::Low);
    }

    #[test]
    fn test_bug_metrics() {
        let sprint = sprint();
        let mut fixed = issue("B-1", "Bug", "Done", 1.0);
        fixed.created = day(2);
        fixed.resolved = Some(day(3));
        let mut critical = issue("B-2", "Bug", "In Progress", 2.0);
        critical.created = day(4);
        critical.priority = Some("Critical".to_string());
        let mut old = issue("B-3", "bug", "To Do", 1.0);
        old.priority = Some("Blocker".to_string());
        let issues = vec![fixed, critical, old, issue("S-1", "Story", "Done", 5.0)];
        let (statuses, config) = (statuses(), config());
        let calc = MetricsCalculator::new(&sprint, &issues, &statuses, &config, day(14));

        let bugs = calc.bug_metrics();
        assert_eq!(bugs.bugs_created, 2);
        assert_eq!(bugs.bugs_resolved, 1);
        assert_eq!(bugs.net_bug_change, 1);
        assert_eq!(bugs.average_resolution_time_hours, 24.0);
        assert_eq!(bugs.critical_bugs_outstanding, 2);
        assert_eq!(bugs.open_bugs, 2);
    }

    #[test]
    fn test_cycle_time_with_improvement() {
        let sprint = sprint();
        let mut fast = issue("A-1", "Story", "Done", 3.0);
        fast.history = vec![IssueChange {
            at: day(2),
            author: None,
            field: "status".to_string(),
            from: Some("To Do".to_string()),
            to: Some("In Progress".to_string()),
        }];
        fast.resolved = Some(day(4));
        let mut slow = issue("A-2", "Bug", "Done", 3.0);
        slow.created = day(1);
        slow.resolved = Some(day(7));
        let issues = vec![fast, slow, issue("A-3", "Story", "To Do", 1.0)];
        let (statuses, config) = (statuses(), config());
        let calc = MetricsCalculator::new(&sprint, &issues, &statuses, &config, day(14));

        let cycle = calc.cycle_time(Some(&[8.0, 8.0]));
        assert_eq!(cycle.sample_size, 2);
        assert_eq!(cycle.average_days, 4.0);
        assert_eq!(cycle.median_days, 4.0);
        assert_eq!(cycle.p90_days, 6.0);
        assert_eq!(cycle.by_type["Story"].average_days, 2.0);
        assert_eq!(cycle.improvement_percentage, Some(50.0));
        assert_eq!(calc.cycle_time(None).improvement_percentage, None);
    }

    #[test]
    fn test_team_capacity() {
        let sprint = sprint();
        let mut a = issue("A-1", "Story", "Done", 3.0);
        a.assignee = Some("dana".to_string());
        let mut b = issue("A-2", "Story", "To Do", 5.0);
        b.assignee = Some("lee".to_string());
        let issues = vec![a, b];
        let records = vec![CapacityRecord {
            assignee: "dana".to_string(),
            planned_hours: Some(60.0),
            adjustments: vec![
                CapacityAdjustment {
                    kind: AdjustmentKind::Pto,
                    hours: 12.0,
                },
                CapacityAdjustment {
                    kind: AdjustmentKind::Meetings,
                    hours: 3.0,
                },
            ],
        }];
        let (statuses, config) = (statuses(), config());
        let calc = MetricsCalculator::new(&sprint, &issues, &statuses, &config, day(14));

        let capacity = calc.team_capacity(&records);
        assert_eq!(capacity.working_days, 10);
        assert_eq!(capacity.members.len(), 2);
        assert_eq!(capacity.members[0].assignee, "dana");
        assert_eq!(capacity.members[0].actual_hours, 45.0);
        assert_eq!(capacity.members[0].utilization_percentage, 75.0);
        assert_eq!(capacity.members[0].completed_story_points, 3.0);
        assert_eq!(capacity.members[1].planned_hours, 60.0);
        assert_eq!(capacity.capacity_loss.pto_hours, 12.0);
        assert_eq!(capacity.total_actual_hours, 105.0);
    }

    #[test]
    fn test_empty_tier2() {
        let sprint = sprint();
        let (statuses, config) = (statuses(), config());
        let calc = MetricsCalculator::new(&sprint, &[], &statuses, &config, day(14));

        let tier2 = calc.tier2(None, &[]);
        assert!(tier2.blockers.is_empty());
        assert_eq!(tier2.bug_metrics.bugs_created, 0);
        assert_eq!(tier2.cycle_time.sample_size, 0);
        assert!(tier2.team_capacity.members.is_empty());
        assert_eq!(tier2.team_capacity.utilization_percentage, 0.0);
    }
}
