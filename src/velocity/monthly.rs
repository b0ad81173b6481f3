use crate::model::{Commit, PullRequest};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyActivity {
    /// `YYYY-MM`
    pub month: String,
    pub commits: usize,
    pub pull_requests: usize,
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Buckets commits (by timestamp) and pull requests (by creation) into
/// calendar months, ascending.
///
/// With an inclusive `range`, every month it touches is present even without
/// activity, and activity outside the range is ignored.
pub fn monthly_activity(
    commits: &[Commit],
    pull_requests: &[PullRequest],
    range: Option<(NaiveDate, NaiveDate)>,
) -> Vec<MonthlyActivity> {
    let mut months: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    if let Some((start, end)) = range {
        let mut cursor = start.with_day(1);
        while let Some(month) = cursor.filter(|month| *month <= end) {
            months.insert(month_key(month), (0, 0));
            cursor = month.checked_add_months(Months::new(1));
        }
    }
    let in_range =
        |date: NaiveDate| range.map_or(true, |(start, end)| date >= start && date <= end);

    for commit in commits {
        let date = commit.timestamp.date_naive();
        if in_range(date) {
            months.entry(month_key(date)).or_default().0 += 1;
        }
    }
    for pr in pull_requests {
        let date = pr.created_at.date_naive();
        if in_range(date) {
            months.entry(month_key(date)).or_default().1 += 1;
        }
    }

    months
        .into_iter()
        .map(|(month, (commits, pull_requests))| MonthlyActivity {
            month,
            commits,
            pull_requests,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn commit_on(year: i32, month: u32, day: u32) -> Commit {
        Commit {
            sha: format!("{year}{month}{day}"),
            author: "dana".to_string(),
            email: "dana@example.com".to_string(),
            message: "work".to_string(),
            timestamp: Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap(),
            branch: None,
            files_changed: 1,
            additions: 1,
            deletions: 0,
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_range_is_zero_filled() {
        let commits = vec![commit_on(2023, 11, 3), commit_on(2024, 2, 10), commit_on(2024, 2, 11)];
        let activity = monthly_activity(
            &commits,
            &[],
            Some((date(2023, 11, 15), date(2024, 3, 2))),
        );

        let months = activity.iter().map(|m| m.month.as_str()).collect::<Vec<_>>();
        assert_eq!(months, vec!["2023-11", "2023-12", "2024-01", "2024-02", "2024-03"]);
        assert_eq!(activity[0].commits, 0);
        assert_eq!(activity[1].commits, 0);
        assert_eq!(activity[3].commits, 2);
    }

    #[test]
    fn test_without_range() {
        let commits = vec![commit_on(2024, 5, 1), commit_on(2024, 3, 1)];
        let activity = monthly_activity(&commits, &[], None);
        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0].month, "2024-03");
        assert!(monthly_activity(&[], &[], None).is_empty());
    }
}
