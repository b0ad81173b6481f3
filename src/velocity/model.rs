use crate::model::{Issue, Sprint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Decreasing => write!(f, "decreasing"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintVelocity {
    pub sprint_id: u64,
    pub name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub velocity: f64,
    pub commitment: f64,
    pub completed_issues: usize,
    pub total_issues: usize,
}

/// Velocity over a trailing window of closed sprints, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityData {
    pub sprints: Vec<SprintVelocity>,
    pub average_velocity: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintPerformance {
    pub sprint_id: u64,
    pub name: String,
    pub planned_points: f64,
    pub completed_issues: usize,
    pub velocity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTypeCount {
    pub issue_type: String,
    pub count: usize,
    pub percentage: f64,
    pub color: String,
}

/// One closed sprint of the window with its basic issue list.
#[derive(Debug, Clone, PartialEq)]
pub struct SprintSample {
    pub sprint: Sprint,
    pub issues: Vec<Issue>,
}
