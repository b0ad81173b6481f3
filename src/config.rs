//! Engine configuration.
//!
//! Loaded from a TOML file; every section and field has a default so an
//! empty file (or no file at all) yields a working configuration.

use crate::error::{Error, Result};
use crate::model::{SprintState, StatusTable};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub velocity: VelocityConfig,

    #[serde(default)]
    pub thresholds: ThresholdConfig,

    #[serde(default)]
    pub capacity: CapacityConfig,

    #[serde(default)]
    pub report: ReportConfig,

    /// Extra status → category mappings layered over the built-in table.
    #[serde(default)]
    pub statuses: IndexMap<String, String>,
}

/// Cache time-to-live settings, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_active_ttl")]
    pub active_sprint_ttl_secs: u64,

    #[serde(default = "default_future_ttl")]
    pub future_sprint_ttl_secs: u64,

    #[serde(default = "default_closed_ttl")]
    pub closed_sprint_ttl_secs: u64,

    /// Closed-sprint list per board.
    #[serde(default = "default_board_ttl")]
    pub board_sprints_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            active_sprint_ttl_secs: default_active_ttl(),
            future_sprint_ttl_secs: default_future_ttl(),
            closed_sprint_ttl_secs: default_closed_ttl(),
            board_sprints_ttl_secs: default_board_ttl(),
        }
    }
}

impl CacheConfig {
    /// TTL for anything derived from a sprint in `state`.
    pub fn sprint_ttl(&self, state: SprintState) -> Duration {
        let secs = match state {
            SprintState::Active => self.active_sprint_ttl_secs,
            SprintState::Future => self.future_sprint_ttl_secs,
            SprintState::Closed => self.closed_sprint_ttl_secs,
        };
        Duration::from_secs(secs)
    }

    pub fn board_ttl(&self) -> Duration {
        Duration::from_secs(self.board_sprints_ttl_secs)
    }
}

fn default_active_ttl() -> u64 {
    300
}

fn default_future_ttl() -> u64 {
    1800
}

fn default_closed_ttl() -> u64 {
    7 * 24 * 3600
}

fn default_board_ttl() -> u64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityConfig {
    /// Closed sprints looked back over when the request does not say.
    #[serde(default = "default_sprint_count")]
    pub default_sprint_count: usize,

    /// Weight of the trailing average in the forecast blend; the most recent
    /// sprint gets the remainder.
    #[serde(default = "default_average_weight")]
    pub average_weight: f64,

    #[serde(default = "default_increase_factor")]
    pub increase_factor: f64,

    #[serde(default = "default_decrease_factor")]
    pub decrease_factor: f64,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            default_sprint_count: default_sprint_count(),
            average_weight: default_average_weight(),
            increase_factor: default_increase_factor(),
            decrease_factor: default_decrease_factor(),
        }
    }
}

fn default_sprint_count() -> usize {
    6
}

fn default_average_weight() -> f64 {
    0.6
}

fn default_increase_factor() -> f64 {
    1.1
}

fn default_decrease_factor() -> f64 {
    0.9
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum completion percentage for a sprint goal to count as achieved.
    #[serde(default = "default_goal_achievement")]
    pub goal_achievement_percent: f64,

    /// Spillover percentage above which the forecast recommends a smaller commitment.
    #[serde(default = "default_spillover_warning")]
    pub spillover_warning_percent: f64,

    #[serde(default = "default_blocker_medium_days")]
    pub blocker_medium_days: i64,

    #[serde(default = "default_blocker_high_days")]
    pub blocker_high_days: i64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            goal_achievement_percent: default_goal_achievement(),
            spillover_warning_percent: default_spillover_warning(),
            blocker_medium_days: default_blocker_medium_days(),
            blocker_high_days: default_blocker_high_days(),
        }
    }
}

fn default_goal_achievement() -> f64 {
    80.0
}

fn default_spillover_warning() -> f64 {
    30.0
}

fn default_blocker_medium_days() -> i64 {
    3
}

fn default_blocker_high_days() -> i64 {
    7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityConfig {
    #[serde(default = "default_hours_per_day")]
    pub hours_per_day: f64,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            hours_per_day: default_hours_per_day(),
        }
    }
}

fn default_hours_per_day() -> f64 {
    6.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Upper bound on one report generation, fetches included.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    120
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.velocity.average_weight) {
            return Err(Error::Config(format!(
                "velocity.average_weight must be within 0..=1, got {}",
                self.velocity.average_weight
            )));
        }
        if self.velocity.increase_factor < self.velocity.decrease_factor {
            return Err(Error::Config(
                "velocity.increase_factor must not be below decrease_factor".into(),
            ));
        }
        if self.thresholds.blocker_high_days < self.thresholds.blocker_medium_days {
            return Err(Error::Config(
                "thresholds.blocker_high_days must not be below blocker_medium_days".into(),
            ));
        }
        self.status_table().map(|_| ())
    }

    pub fn status_table(&self) -> Result<StatusTable> {
        StatusTable::with_overrides(&self.statuses)
    }
}
