use crate::model::StatusCategory;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-step scale shared by impact, probability and confidence ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn weight(&self) -> u8 {
        match self {
            Level::Low => 1,
            Level::Medium => 2,
            Level::High => 3,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "low"),
            Level::Medium => write!(f, "medium"),
            Level::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeBreakdown {
    pub count: usize,
    pub completed: usize,
    pub story_points: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintMetrics {
    pub total_issues: usize,
    pub completed_issues: usize,
    pub total_story_points: f64,
    pub completed_story_points: f64,
    /// Completed issues / total issues, in percent.
    pub completion_rate: f64,
    pub velocity: f64,
    pub spillover_percentage: f64,
    pub by_type: IndexMap<String, TypeBreakdown>,
    pub by_status: IndexMap<StatusCategory, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurndownPoint {
    pub date: NaiveDate,
    pub ideal_remaining: f64,
    pub actual_remaining: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Burndown {
    pub total_story_points: f64,
    pub points: Vec<BurndownPoint>,
}

// Tier 1

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintGoalAnalysis {
    pub goal: Option<String>,
    pub total_story_points: f64,
    pub completed_story_points: f64,
    pub completion_percentage: f64,
    pub achievement_threshold: f64,
    pub achieved: bool,
    pub delivered: Vec<String>,
    pub missed: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeChangeKind {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeChange {
    pub issue_key: String,
    pub kind: ScopeChangeKind,
    pub at: DateTime<Utc>,
    /// Positive for additions, negative for removals.
    pub story_points_delta: f64,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpilloverReason {
    Blocked,
    Underestimated,
    ScopeAddedLate,
    Dependency,
    Unspecified,
}

impl fmt::Display for SpilloverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpilloverReason::Blocked => write!(f, "blocked"),
            SpilloverReason::Underestimated => write!(f, "underestimated"),
            SpilloverReason::ScopeAddedLate => write!(f, "scope added late"),
            SpilloverReason::Dependency => write!(f, "dependency"),
            SpilloverReason::Unspecified => write!(f, "unspecified"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpilloverIssue {
    pub issue_key: String,
    pub status: String,
    pub story_points: f64,
    pub reason: SpilloverReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpilloverAnalysis {
    pub committed_story_points: f64,
    pub incomplete_story_points: f64,
    pub spillover_percentage: f64,
    pub incomplete_issues: Vec<SpilloverIssue>,
    pub reasons: IndexMap<SpilloverReason, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier1Metrics {
    pub sprint_goal: SprintGoalAnalysis,
    pub scope_changes: Vec<ScopeChange>,
    pub spillover: SpilloverAnalysis,
}

// Tier 2

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockerImpediment {
    pub issue_key: String,
    pub summary: String,
    pub reason: Option<String>,
    pub flagged_at: Option<DateTime<Utc>>,
    pub days_blocked: i64,
    pub priority: Option<String>,
    pub impact: Level,
    pub resolved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugMetrics {
    pub bugs_created: usize,
    pub bugs_resolved: usize,
    pub net_bug_change: i64,
    pub average_resolution_time_hours: f64,
    pub critical_bugs_outstanding: usize,
    pub open_bugs: usize,
    pub by_priority: IndexMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleTimeGroup {
    pub count: usize,
    pub average_days: f64,
    pub median_days: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleTimeMetrics {
    pub sample_size: usize,
    pub average_days: f64,
    pub median_days: f64,
    pub p90_days: f64,
    pub by_type: IndexMap<String, CycleTimeGroup>,
    pub by_priority: IndexMap<String, CycleTimeGroup>,
    /// Positive when this sprint's average is faster than the previous one.
    pub improvement_percentage: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    Pto,
    Meetings,
    Sick,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityAdjustment {
    pub kind: AdjustmentKind,
    pub hours: f64,
}

/// Caller-supplied availability for one team member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityRecord {
    pub assignee: String,
    #[serde(default)]
    pub planned_hours: Option<f64>,
    #[serde(default)]
    pub adjustments: Vec<CapacityAdjustment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberCapacity {
    pub assignee: String,
    pub planned_hours: f64,
    pub actual_hours: f64,
    pub utilization_percentage: f64,
    pub assigned_story_points: f64,
    pub completed_story_points: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityLoss {
    pub pto_hours: f64,
    pub meeting_hours: f64,
    pub sick_hours: f64,
    pub other_hours: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCapacity {
    pub working_days: i64,
    pub members: Vec<MemberCapacity>,
    pub total_planned_hours: f64,
    pub total_actual_hours: f64,
    pub utilization_percentage: f64,
    pub capacity_loss: CapacityLoss,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier2Metrics {
    pub blockers: Vec<BlockerImpediment>,
    pub bug_metrics: BugMetrics,
    pub cycle_time: CycleTimeMetrics,
    pub team_capacity: TeamCapacity,
}

// Tier 3

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicProgress {
    pub epic_key: String,
    pub epic_name: Option<String>,
    pub total_issues: usize,
    pub completed_issues: usize,
    pub remaining_issues: usize,
    pub total_story_points: f64,
    pub completed_story_points: f64,
    pub remaining_story_points: f64,
    pub completion_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalDebt {
    pub total_items: usize,
    pub total_story_points: f64,
    pub added: usize,
    pub addressed: usize,
    pub net_tech_debt_change: i64,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskStatus {
    Active,
    Mitigated,
    Occurred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskItem {
    pub issue_key: String,
    pub summary: String,
    pub probability: Level,
    pub impact: Level,
    /// Probability weight × impact weight, 1..=9.
    pub score: u8,
    pub days_flagged: i64,
    pub status: RiskStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier3Metrics {
    pub epic_progress: Vec<EpicProgress>,
    pub technical_debt: TechnicalDebt,
    pub risks: Vec<RiskItem>,
}

// Forward looking

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextSprintForecast {
    pub forecasted_velocity: f64,
    pub trailing_average: f64,
    pub recent_velocity: f64,
    pub confidence_level: Level,
    pub carryover_story_points: f64,
    pub available_capacity: f64,
    pub recommendations: Vec<String>,
}

impl Default for NextSprintForecast {
    fn default() -> Self {
        Self {
            forecasted_velocity: 0.0,
            trailing_average: 0.0,
            recent_velocity: 0.0,
            confidence_level: Level::Low,
            carryover_story_points: 0.0,
            available_capacity: 0.0,
            recommendations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarryoverItem {
    pub issue_key: String,
    pub summary: String,
    pub story_points: f64,
    pub reason: SpilloverReason,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub days_in_progress: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonCount {
    pub reason: SpilloverReason,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarryoverItems {
    pub items: Vec<CarryoverItem>,
    pub total_story_points: f64,
    pub percentage_of_original_commitment: f64,
    pub most_common_reasons: Vec<ReasonCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardLooking {
    pub next_sprint_forecast: NextSprintForecast,
    pub carryover: CarryoverItems,
}
