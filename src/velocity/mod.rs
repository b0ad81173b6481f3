//! Trailing velocity over a board's closed sprints.
//!
//! The closed-sprint list and every sprint's basic issue list are cached
//! separately, so different report sections sharing one board reuse each
//! other's fetches.

mod model;
mod monthly;

pub use model::*;
pub use monthly::{monthly_activity, MonthlyActivity};

use crate::cache::{keys, CacheStore, JsonCache};
use crate::config::Config;
use crate::error::ProviderResult;
use crate::metrics::stats::{mean, percent, round2};
use crate::metrics::velocity_of;
use crate::model::{Issue, Sprint, SprintState, StatusTable};
use crate::provider::{DataProvider, FetchLevel};
use futures::future::join_all;
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

const MIN_TREND_SPRINTS: usize = 3;
const DEFAULT_TYPE_COLOR: &str = "#A5ADBA";
const TYPE_PALETTE: &[(&str, &str)] = &[
    ("story", "#36B37E"),
    ("bug", "#FF5630"),
    ("task", "#0065FF"),
    ("sub-task", "#00B8D9"),
    ("subtask", "#00B8D9"),
    ("epic", "#6554C0"),
    ("improvement", "#FFAB00"),
    ("spike", "#8777D9"),
    ("technical debt", "#97A0AF"),
];

fn type_color(issue_type: &str) -> &'static str {
    let issue_type = issue_type.trim().to_lowercase();
    TYPE_PALETTE
        .iter()
        .find(|(name, _)| *name == issue_type)
        .map_or(DEFAULT_TYPE_COLOR, |(_, color)| *color)
}

/// Classifies a window given oldest-first velocities.
pub fn classify_trend(velocities: &[f64], increase_factor: f64, decrease_factor: f64) -> Trend {
    if velocities.len() < MIN_TREND_SPRINTS {
        return Trend::Stable;
    }
    let (first, second) = velocities.split_at(velocities.len() / 2);
    let (first, second) = (mean(first), mean(second));
    if second > first * increase_factor {
        Trend::Increasing
    } else if second < first * decrease_factor {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

pub struct VelocityAnalyzer {
    provider: Arc<dyn DataProvider>,
    cache: JsonCache,
    statuses: StatusTable,
    config: Config,
}

// Create
impl VelocityAnalyzer {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        cache: Arc<dyn CacheStore>,
        statuses: StatusTable,
        config: Config,
    ) -> Self {
        Self {
            provider,
            cache: JsonCache::new(cache),
            statuses,
            config,
        }
    }
}

// Fetch
impl VelocityAnalyzer {
    async fn closed_sprints(&self, board_id: u64) -> ProviderResult<Vec<Sprint>> {
        let key = keys::closed_sprints(board_id);
        if let Some(sprints) = self.cache.get::<Vec<Sprint>>(&key).await {
            return Ok(sprints);
        }
        let sprints = self.provider.closed_sprints(board_id).await?;
        self.cache
            .set(&key, &sprints, self.config.cache.board_ttl())
            .await;
        Ok(sprints)
    }

    /// Up to `count` most recent closed sprints of `board_id`, newest first,
    /// each with its basic issue list.
    pub async fn load_window(
        &self,
        board_id: u64,
        count: usize,
    ) -> ProviderResult<Vec<SprintSample>> {
        let selected = self
            .closed_sprints(board_id)
            .await?
            .into_iter()
            .sorted_by(|a, b| b.start_date.cmp(&a.start_date).then_with(|| b.id.cmp(&a.id)))
            .take(count)
            .collect::<Vec<_>>();

        let issue_keys = selected
            .iter()
            .map(|sprint| keys::sprint_issues(sprint.id, FetchLevel::Basic))
            .collect::<Vec<_>>();
        let mut cached = self.cache.get_many::<Vec<Issue>>(&issue_keys).await;

        let missing = selected
            .iter()
            .zip(&issue_keys)
            .filter(|(_, key)| !cached.contains_key(*key))
            .map(|(sprint, key)| (sprint.id, key.clone()))
            .collect::<Vec<_>>();
        info!(
            board_id,
            selected = selected.len(),
            missing = missing.len(),
            "loading velocity window"
        );

        let fetched = join_all(missing.into_iter().map(|(sprint_id, key)| async move {
            let issues = self.provider.issues(sprint_id, FetchLevel::Basic).await;
            (key, issues)
        }))
        .await;

        let mut fresh = Vec::new();
        let mut failure = None;
        for (key, issues) in fetched {
            match issues {
                Ok(issues) => fresh.push((key, issues)),
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        self.cache
            .set_many(fresh.clone(), self.config.cache.sprint_ttl(SprintState::Closed))
            .await;
        if let Some(e) = failure {
            return Err(e);
        }
        cached.extend(fresh);

        Ok(selected
            .into_iter()
            .zip(issue_keys)
            .map(|(sprint, key)| SprintSample {
                issues: cached.remove(&key).unwrap_or_default(),
                sprint,
            })
            .collect())
    }

    pub async fn velocity(&self, board_id: u64, count: usize) -> ProviderResult<VelocityData> {
        let window = self.load_window(board_id, count).await?;
        Ok(self.velocity_data(&window))
    }
}

// Analysis
impl VelocityAnalyzer {
    pub fn velocity_data(&self, window: &[SprintSample]) -> VelocityData {
        let sprints = window
            .iter()
            .map(|sample| SprintVelocity {
                sprint_id: sample.sprint.id,
                name: sample.sprint.name.clone(),
                start_date: sample.sprint.start_date,
                velocity: velocity_of(&sample.issues, &self.statuses),
                commitment: sample.issues.iter().map(Issue::points).sum(),
                completed_issues: sample
                    .issues
                    .iter()
                    .filter(|issue| issue.is_completed(&self.statuses))
                    .count(),
                total_issues: sample.issues.len(),
            })
            .collect::<Vec<_>>();
        let velocities = sprints.iter().map(|s| s.velocity).collect::<Vec<_>>();
        let oldest_first = velocities.iter().rev().copied().collect::<Vec<_>>();
        let trend = classify_trend(
            &oldest_first,
            self.config.velocity.increase_factor,
            self.config.velocity.decrease_factor,
        );
        debug!(sprints = sprints.len(), %trend, "velocity computed");

        VelocityData {
            average_velocity: round2(mean(&velocities)),
            sprints,
            trend,
        }
    }

    pub fn team_performance(&self, window: &[SprintSample]) -> Vec<SprintPerformance> {
        self.velocity_data(window)
            .sprints
            .into_iter()
            .map(|sprint| SprintPerformance {
                sprint_id: sprint.sprint_id,
                name: sprint.name,
                planned_points: sprint.commitment,
                completed_issues: sprint.completed_issues,
                velocity: sprint.velocity,
            })
            .collect()
    }

    pub fn issue_type_distribution(&self, window: &[SprintSample]) -> Vec<IssueTypeCount> {
        let counts: HashMap<&str, usize> = window
            .iter()
            .flat_map(|sample| &sample.issues)
            .counts_by(|issue| issue.issue_type.as_str());
        let total = counts.values().sum::<usize>();

        counts
            .into_iter()
            .sorted_by(|(a_type, a), (b_type, b)| b.cmp(a).then_with(|| a_type.cmp(b_type)))
            .map(|(issue_type, count)| IssueTypeCount {
                issue_type: issue_type.to_string(),
                count,
                percentage: round2(percent(count as f64, total as f64)),
                color: type_color(issue_type).to_string(),
            })
            .collect()
    }

    /// The closed sprint immediately preceding `current` within the window.
    pub fn previous_sprint<'a>(
        window: &'a [SprintSample],
        current: &Sprint,
    ) -> Option<&'a SprintSample> {
        window
            .iter()
            .filter(|sample| sample.sprint.id != current.id)
            .find(|sample| match (sample.sprint.start_date, current.start_date) {
                (Some(previous), Some(current)) => previous < current,
                _ => true,
            })
    }
}
