//! Tiered sprint analytics.
//!
//! Every calculation is a pure function of the sprint, its issue collection
//! and an explicit `as_of` instant. Empty collections produce zeroed results.

mod forecast;
pub mod model;
mod sprint;
pub mod stats;
mod tier1;
mod tier2;
mod tier3;

pub use forecast::ForecastAnalyzer;
pub use model::*;
pub use sprint::SprintAnalyzer;
pub(crate) use sprint::velocity_of;
pub use tier1::Tier1Analyzer;
pub use tier2::{cycle_times, Tier2Analyzer};
pub use tier3::Tier3Analyzer;

use crate::config::Config;
use crate::model::{Issue, Sprint, StatusTable};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy)]
pub struct MetricsCalculator<'a> {
    pub sprint: &'a Sprint,
    pub issues: &'a [Issue],
    pub statuses: &'a StatusTable,
    pub config: &'a Config,
    pub as_of: DateTime<Utc>,
}

impl<'a> MetricsCalculator<'a> {
    pub fn new(
        sprint: &'a Sprint,
        issues: &'a [Issue],
        statuses: &'a StatusTable,
        config: &'a Config,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            sprint,
            issues,
            statuses,
            config,
            as_of,
        }
    }

    pub(crate) fn completed(&self) -> impl Iterator<Item = &'a Issue> + '_ {
        self.issues
            .iter()
            .filter(|issue| issue.is_completed(self.statuses))
    }

    pub(crate) fn incomplete(&self) -> impl Iterator<Item = &'a Issue> + '_ {
        self.issues
            .iter()
            .filter(|issue| !issue.is_completed(self.statuses))
    }

    pub(crate) fn committed_points(&self) -> f64 {
        self.issues.iter().map(Issue::points).sum()
    }

    pub(crate) fn completed_points(&self) -> f64 {
        self.completed().map(Issue::points).sum()
    }

    /// Share of commitment not completed, in percent. Falls back to issue
    /// counts when nothing carries an estimate.
    pub(crate) fn spillover_percentage(&self) -> f64 {
        let committed = self.committed_points();
        if committed > 0.0 {
            stats::percent(committed - self.completed_points(), committed)
        } else {
            stats::percent(self.incomplete().count() as f64, self.issues.len() as f64)
        }
    }
}
