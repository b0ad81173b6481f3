use crate::metrics::stats::{mean, percent, round2, std_dev};
use crate::metrics::{
    CarryoverItem, CarryoverItems, ForwardLooking, Level, MetricsCalculator, NextSprintForecast,
    ReasonCount, SpilloverReason,
};
use crate::model::{Issue, StatusCategory};
use crate::velocity::{Trend, VelocityData};
use itertools::Itertools;

const HIGH_CONFIDENCE_CV: f64 = 0.15;
const MEDIUM_CONFIDENCE_CV: f64 = 0.30;
const MIN_TREND_SPRINTS: usize = 3;

pub trait ForecastAnalyzer {
    /// `history` is the trailing closed-sprint velocity window, newest first.
    fn next_sprint_forecast(&self, history: Option<&VelocityData>) -> NextSprintForecast;
    fn carryover_items(&self) -> CarryoverItems;

    fn forward_looking(&self, history: Option<&VelocityData>) -> ForwardLooking {
        ForwardLooking {
            next_sprint_forecast: self.next_sprint_forecast(history),
            carryover: self.carryover_items(),
        }
    }
}

/// Confidence from the coefficient of variation of trailing velocity.
fn confidence(velocities: &[f64]) -> Level {
    let average = mean(velocities);
    if velocities.len() < MIN_TREND_SPRINTS || average <= 0.0 {
        return Level::Low;
    }
    let cv = std_dev(velocities) / average;
    if cv <= HIGH_CONFIDENCE_CV {
        Level::High
    } else if cv <= MEDIUM_CONFIDENCE_CV {
        Level::Medium
    } else {
        Level::Low
    }
}

impl MetricsCalculator<'_> {
    fn days_in_progress(&self, issue: &Issue) -> i64 {
        let started = issue
            .first_transition_to(self.statuses, StatusCategory::InProgress)
            .or_else(|| {
                (issue.category(self.statuses) == StatusCategory::InProgress)
                    .then_some(issue.created)
            });
        let until = self
            .sprint
            .end_date
            .map_or(self.as_of, |end| end.min(self.as_of));
        started.map_or(0, |started| (until - started).num_days().max(0))
    }
}

impl ForecastAnalyzer for MetricsCalculator<'_> {
    fn next_sprint_forecast(&self, history: Option<&VelocityData>) -> NextSprintForecast {
        let velocities = history
            .map(|history| history.sprints.iter().map(|s| s.velocity).collect::<Vec<_>>())
            .unwrap_or_default();
        let (trailing_average, recent_velocity) = match velocities.first() {
            Some(recent) => (mean(&velocities), *recent),
            None => {
                let current = self.completed_points();
                (current, current)
            }
        };
        let weight = self.config.velocity.average_weight;
        let blended = weight * trailing_average + (1.0 - weight) * recent_velocity;
        // The blend shrinks by the share of this sprint's commitment that spilled over.
        let spillover = self.spillover_percentage();
        let forecasted_velocity = blended * (1.0 - spillover / 100.0);
        let carryover = self.incomplete().map(Issue::points).sum::<f64>();
        let available_capacity = (forecasted_velocity - carryover).max(0.0);
        let confidence_level = confidence(&velocities);

        let mut recommendations = Vec::new();
        if velocities.is_empty() {
            recommendations.push(
                "No closed-sprint history; forecast is based on this sprint alone".to_string(),
            );
        }
        if spillover > self.config.thresholds.spillover_warning_percent {
            recommendations.push(format!(
                "Reduce commitment: {spillover:.1}% of committed points spilled over"
            ));
        }
        if !velocities.is_empty() && confidence_level == Level::Low {
            recommendations.push(
                "Velocity is volatile; plan conservatively and keep a buffer".to_string(),
            );
        }
        if history.is_some_and(|h| h.trend == Trend::Decreasing) {
            recommendations
                .push("Velocity is trending down; review recurring impediments".to_string());
        }
        if forecasted_velocity > 0.0 && carryover > forecasted_velocity * 0.5 {
            recommendations.push(format!(
                "Carryover of {carryover:.1} points consumes most of the forecast; finish it before pulling new work"
            ));
        }
        let late = self.late_additions();
        let blocked = self
            .incomplete()
            .filter(|issue| self.spillover_reason(issue, &late).is_blocking())
            .count();
        if blocked > 0 {
            recommendations.push(format!(
                "Resolve {blocked} blocked item(s) before sprint planning"
            ));
        }
        if recommendations.is_empty() {
            recommendations.push("Current commitment level is sustainable".to_string());
        }

        NextSprintForecast {
            forecasted_velocity: round2(forecasted_velocity),
            trailing_average: round2(trailing_average),
            recent_velocity: round2(recent_velocity),
            confidence_level,
            carryover_story_points: carryover,
            available_capacity: round2(available_capacity),
            recommendations,
        }
    }

    fn carryover_items(&self) -> CarryoverItems {
        let late = self.late_additions();
        let items = self
            .incomplete()
            .map(|issue| CarryoverItem {
                issue_key: issue.key.clone(),
                summary: issue.summary.clone(),
                story_points: issue.points(),
                reason: self.spillover_reason(issue, &late),
                priority: issue.priority.clone(),
                assignee: issue.assignee.clone(),
                days_in_progress: self.days_in_progress(issue),
            })
            .collect::<Vec<_>>();
        let total_story_points = items.iter().map(|item| item.story_points).sum::<f64>();
        let most_common_reasons = items
            .iter()
            .counts_by(|item| item.reason)
            .into_iter()
            .sorted_by(|(a_reason, a), (b_reason, b)| b.cmp(a).then_with(|| a_reason.cmp(b_reason)))
            .map(|(reason, count)| ReasonCount { reason, count })
            .collect();

        CarryoverItems {
            percentage_of_original_commitment: round2(percent(
                total_story_points,
                self.committed_points(),
            )),
            items,
            total_story_points,
            most_common_reasons,
        }
    }
}

impl SpilloverReason {
    pub fn is_blocking(&self) -> bool {
        matches!(self, SpilloverReason::Blocked | SpilloverReason::Dependency)
    }
}
