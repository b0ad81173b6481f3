use crate::model::Issue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintState {
    Active,
    Closed,
    Future,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: u64,
    pub board_id: u64,
    pub name: String,
    pub state: SprintState,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub complete_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// Inclusive `[since, until]` range a sprint covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprintWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl SprintWindow {
    pub fn new(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self { since, until }
    }

    pub fn contains(&self, datetime: &DateTime<Utc>) -> bool {
        *datetime >= self.since && *datetime <= self.until
    }

    pub fn contains_opt(&self, datetime: &Option<DateTime<Utc>>) -> bool {
        datetime.as_ref().is_some_and(|datetime| self.contains(datetime))
    }
}

// Create
impl Sprint {
    pub fn new(
        id: u64,
        board_id: u64,
        name: impl ToString,
        state: SprintState,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            board_id,
            name: name.to_string(),
            state,
            start_date,
            end_date,
            complete_date: None,
            goal: None,
            issues: Vec::new(),
        }
    }

    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_goal(mut self, goal: impl ToString) -> Self {
        self.goal = Some(goal.to_string());
        self
    }
}

// Window
impl Sprint {
    pub fn window(&self) -> Option<SprintWindow> {
        match (self.start_date, self.end_date) {
            (Some(since), Some(until)) => Some(SprintWindow::new(since, until)),
            _ => None,
        }
    }

    /// Instant "now"-relative metrics are measured against. Closed sprints are
    /// frozen at their completion so reruns give the same numbers.
    pub fn as_of(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.state {
            SprintState::Closed => self
                .complete_date
                .or(self.end_date)
                .map(|end| end.min(now))
                .unwrap_or(now),
            SprintState::Active | SprintState::Future => now,
        }
    }

    /// Copy without the embedded issue list, used for report headers.
    pub fn header(&self) -> Self {
        Self {
            issues: Vec::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_is_inclusive() {
        let since = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap();
        let window = SprintWindow::new(since, until);

        assert!(window.contains(&since));
        assert!(window.contains(&until));
        assert!(!window.contains(&(until + chrono::Duration::seconds(1))));
        assert!(!window.contains_opt(&None));
    }

    #[test]
    fn test_closed_sprint_is_measured_at_completion() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        let closed = Sprint::new(1, 7, "Sprint 1", SprintState::Closed, Some(start), Some(end));
        assert_eq!(closed.as_of(now), end);

        let active = Sprint::new(2, 7, "Sprint 2", SprintState::Active, Some(start), Some(end));
        assert_eq!(active.as_of(now), now);
    }
}
