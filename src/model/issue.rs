use crate::model::{StatusCategory, StatusTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicLink {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One field transition from an issue's change history. Only present on
/// issues fetched at [`crate::provider::FetchLevel::Enhanced`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueChange {
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<String>,
    pub field: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

impl IssueChange {
    pub fn is_field(&self, field: &str) -> bool {
        self.field.eq_ignore_ascii_case(field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub key: String,
    #[serde(default)]
    pub summary: String,
    pub status: String,
    #[serde(default)]
    pub story_points: Option<f64>,
    pub issue_type: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub flag_reason: Option<String>,
    #[serde(default)]
    pub flagged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub epic: Option<EpicLink>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub resolved: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: Vec<IssueChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Lowest,
    Low,
    Medium,
    High,
    Highest,
    Critical,
    Blocker,
}

impl Priority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "lowest" | "trivial" => Some(Priority::Lowest),
            "low" | "minor" => Some(Priority::Low),
            "medium" | "normal" | "major" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "highest" | "urgent" => Some(Priority::Highest),
            "critical" => Some(Priority::Critical),
            "blocker" => Some(Priority::Blocker),
            _ => None,
        }
    }

    pub fn is_high(&self) -> bool {
        *self >= Priority::High
    }
}

// Create
impl Issue {
    pub fn new(
        key: impl ToString,
        issue_type: impl ToString,
        status: impl ToString,
        story_points: Option<f64>,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.to_string(),
            summary: String::new(),
            status: status.to_string(),
            story_points,
            issue_type: issue_type.to_string(),
            labels: Vec::new(),
            flagged: false,
            flag_reason: None,
            flagged_at: None,
            epic: None,
            priority: None,
            assignee: None,
            created,
            resolved: None,
            history: Vec::new(),
        }
    }
}

// Accessors
impl Issue {
    /// Story points, with missing or negative estimates counted as zero.
    pub fn points(&self) -> f64 {
        self.story_points.unwrap_or(0.0).max(0.0)
    }

    pub fn priority(&self) -> Option<Priority> {
        self.priority.as_deref().and_then(Priority::parse)
    }

    pub fn is_type(&self, issue_type: &str) -> bool {
        self.issue_type.eq_ignore_ascii_case(issue_type)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }

    pub fn has_any_label(&self, labels: &[&str]) -> bool {
        labels.iter().any(|label| self.has_label(label))
    }

    pub fn category(&self, table: &StatusTable) -> StatusCategory {
        table.categorize(&self.status)
    }

    pub fn is_completed(&self, table: &StatusTable) -> bool {
        table.is_completed(&self.status)
    }

    /// Completion instant: the resolution date, or the first transition into a
    /// completed status when the tracker did not stamp one.
    pub fn completed_at(&self, table: &StatusTable) -> Option<DateTime<Utc>> {
        if !self.is_completed(table) {
            return None;
        }
        self.resolved
            .or_else(|| self.first_transition_to(table, StatusCategory::Completed))
    }

    pub fn first_transition_to(
        &self,
        table: &StatusTable,
        category: StatusCategory,
    ) -> Option<DateTime<Utc>> {
        self.history
            .iter()
            .filter(|change| change.is_field("status"))
            .filter(|change| {
                change
                    .to
                    .as_deref()
                    .is_some_and(|to| table.categorize(to) == category)
            })
            .map(|change| change.at)
            .min()
    }

    /// Start of work: first move into an in-progress status, falling back to
    /// the creation date.
    pub fn started_at(&self, table: &StatusTable) -> DateTime<Utc> {
        self.first_transition_to(table, StatusCategory::InProgress)
            .unwrap_or(self.created)
    }

    /// When the flag currently on the issue was raised.
    pub fn flagged_since(&self) -> Option<DateTime<Utc>> {
        if !self.flagged {
            return None;
        }
        self.flagged_at.or_else(|| {
            self.history
                .iter()
                .filter(|change| change.is_field("flagged"))
                .filter(|change| change.to.as_deref().is_some_and(|to| !to.is_empty()))
                .map(|change| change.at)
                .max()
        })
    }
}
