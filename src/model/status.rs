use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Canonical bucket a free-text tracker status falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Todo,
    InProgress,
    Completed,
    Discarded,
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCategory::Todo => write!(f, "todo"),
            StatusCategory::InProgress => write!(f, "in_progress"),
            StatusCategory::Completed => write!(f, "completed"),
            StatusCategory::Discarded => write!(f, "discarded"),
        }
    }
}

impl FromStr for StatusCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "todo" | "to_do" => Ok(StatusCategory::Todo),
            "in_progress" | "inprogress" => Ok(StatusCategory::InProgress),
            "completed" | "complete" => Ok(StatusCategory::Completed),
            "discarded" => Ok(StatusCategory::Discarded),
            other => Err(Error::Config(format!("unknown status category '{other}'"))),
        }
    }
}

const BUILTIN: &[(&str, StatusCategory)] = &[
    ("done", StatusCategory::Completed),
    ("closed", StatusCategory::Completed),
    ("resolved", StatusCategory::Completed),
    ("in progress", StatusCategory::InProgress),
    ("in review", StatusCategory::InProgress),
    ("code review", StatusCategory::InProgress),
    ("review", StatusCategory::InProgress),
    ("testing", StatusCategory::InProgress),
    ("in testing", StatusCategory::InProgress),
    ("qa", StatusCategory::InProgress),
    ("blocked", StatusCategory::InProgress),
    ("to do", StatusCategory::Todo),
    ("todo", StatusCategory::Todo),
    ("open", StatusCategory::Todo),
    ("new", StatusCategory::Todo),
    ("backlog", StatusCategory::Todo),
    ("selected for development", StatusCategory::Todo),
    ("reopened", StatusCategory::Todo),
    ("won't do", StatusCategory::Discarded),
    ("wont do", StatusCategory::Discarded),
    ("cancelled", StatusCategory::Discarded),
    ("canceled", StatusCategory::Discarded),
    ("duplicate", StatusCategory::Discarded),
    ("rejected", StatusCategory::Discarded),
];

/// Case-insensitive status → category lookup. Unknown statuses fall back to
/// [`StatusCategory::Todo`].
#[derive(Debug, Clone)]
pub struct StatusTable {
    entries: HashMap<String, StatusCategory>,
}

impl Default for StatusTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// Create
impl StatusTable {
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(status, category)| (status.to_string(), *category))
            .collect();
        Self { entries }
    }

    /// Built-in table with `overrides` (status → category name) layered on top.
    pub fn with_overrides(overrides: &IndexMap<String, String>) -> Result<Self> {
        let mut table = Self::builtin();
        for (status, category) in overrides {
            let status = normalize(status);
            if status.is_empty() {
                return Err(Error::Config("empty status name in [statuses]".into()));
            }
            let category = category.parse::<StatusCategory>()?;
            table.entries.insert(status, category);
        }
        Ok(table)
    }
}

// Lookup
impl StatusTable {
    pub fn categorize(&self, status: &str) -> StatusCategory {
        self.entries
            .get(&normalize(status))
            .copied()
            .unwrap_or(StatusCategory::Todo)
    }

    pub fn is_completed(&self, status: &str) -> bool {
        self.categorize(status) == StatusCategory::Completed
    }
}

fn normalize(status: &str) -> String {
    status.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_case_insensitive() {
        let table = StatusTable::builtin();
        assert_eq!(table.categorize("DONE"), StatusCategory::Completed);
        assert_eq!(table.categorize(" Resolved "), StatusCategory::Completed);
        assert_eq!(table.categorize("In Review"), StatusCategory::InProgress);
        assert_eq!(table.categorize("Won't Do"), StatusCategory::Discarded);
        assert_eq!(table.categorize("Something custom"), StatusCategory::Todo);
    }

    #[test]
    fn test_overrides_are_validated() {
        let mut overrides = IndexMap::new();
        overrides.insert("Ready to Ship".to_string(), "completed".to_string());
        let table = StatusTable::with_overrides(&overrides).unwrap();
        assert!(table.is_completed("ready to ship"));

        overrides.insert("Parked".to_string(), "sleeping".to_string());
        assert!(StatusTable::with_overrides(&overrides).is_err());

        let mut empty = IndexMap::new();
        empty.insert("  ".to_string(), "todo".to_string());
        assert!(StatusTable::with_overrides(&empty).is_err());
    }
}
