use crate::correlation::keys::issue_keys;
use crate::correlation::model::{
    AuthorChanges, CodeChangeStats, CommitActivity, DailyCount, EnhancedSourceControlMetrics,
    IssueTraceability, PullRequestStats, ReviewStats, TraceabilityStatus,
};
use crate::metrics::stats::{hours_between, mean, percent, ratio};
use crate::model::{Commit, Issue, PullRequest, ReviewState, SprintWindow};
use crate::velocity::monthly_activity;
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

/// Links source-control activity to issue keys and summarises it.
///
/// Attribution uses only explicit key mentions (commit message, PR title and
/// body, branch name, provider-extracted links). The sprint window narrows
/// aggregate activity stats but never attributes an issue on its own.
#[derive(Debug, Clone, Default)]
pub struct CorrelationEngine {
    window: Option<SprintWindow>,
}

impl CorrelationEngine {
    pub fn new(window: Option<SprintWindow>) -> Self {
        Self { window }
    }

    fn in_window<'a>(&self, commits: &'a [Commit]) -> Vec<&'a Commit> {
        commits
            .iter()
            .filter(|commit| {
                self.window
                    .map_or(true, |window| window.contains(&commit.timestamp))
            })
            .collect()
    }
}

// Linking
impl CorrelationEngine {
    /// Keys a pull request refers to, from text first and branch second.
    pub fn pull_request_keys(pr: &PullRequest) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        keys.extend(issue_keys(&pr.title));
        if let Some(body) = &pr.body {
            keys.extend(issue_keys(body));
        }
        if let Some(branch) = &pr.source_branch {
            keys.extend(issue_keys(branch));
        }
        keys.extend(pr.linked_issues.iter().cloned());
        keys
    }

    pub fn commit_keys(commit: &Commit) -> BTreeSet<String> {
        let mut keys = issue_keys(&commit.message)
            .into_iter()
            .collect::<BTreeSet<_>>();
        if let Some(branch) = &commit.branch {
            keys.extend(issue_keys(branch));
        }
        keys
    }

    /// Traceability per issue. Every key in `scope` gets an entry, linked or
    /// not; keys found outside the scope follow in sorted order.
    ///
    /// Once an issue has a pull request, its commit and line counts come from
    /// its pull requests alone, since their commits are already part of them.
    /// Loose commit numbers are used only for issues without one.
    pub fn link(
        &self,
        scope: &[String],
        commits: &[Commit],
        pull_requests: &[PullRequest],
    ) -> IndexMap<String, IssueTraceability> {
        let mut linked: BTreeMap<String, Tally> = BTreeMap::new();

        for pr in pull_requests {
            for key in Self::pull_request_keys(pr) {
                let tally = linked.entry(key).or_default();
                if !tally.pull_requests.contains(&pr.number) {
                    tally.pull_requests.push(pr.number);
                    tally.pr_commits += pr.commit_count;
                    tally.pr_lines += pr.lines_changed();
                }
            }
        }
        for commit in commits {
            for key in Self::commit_keys(commit) {
                let tally = linked.entry(key).or_default();
                tally.commits += 1;
                tally.commit_lines += commit.lines_changed();
            }
        }

        let mut result = IndexMap::new();
        for key in scope {
            let tally = linked.remove(key).unwrap_or_default();
            result.insert(key.clone(), tally.into_traceability());
        }
        result.extend(
            linked
                .into_iter()
                .map(|(key, tally)| (key, tally.into_traceability())),
        );
        result
    }
}

#[derive(Debug, Default)]
struct Tally {
    pull_requests: Vec<u64>,
    pr_commits: usize,
    pr_lines: usize,
    commits: usize,
    commit_lines: usize,
}

impl Tally {
    fn into_traceability(mut self) -> IssueTraceability {
        self.pull_requests.sort_unstable();
        if self.pull_requests.is_empty() {
            IssueTraceability {
                pull_requests: self.pull_requests,
                commit_count: self.commits,
                lines_changed: self.commit_lines,
                status: TraceabilityStatus::Untraced,
            }
        } else {
            IssueTraceability {
                pull_requests: self.pull_requests,
                commit_count: self.pr_commits,
                lines_changed: self.pr_lines,
                status: TraceabilityStatus::Complete,
            }
        }
    }
}

// Activity
impl CorrelationEngine {
    pub fn commit_activity(&self, commits: &[Commit]) -> CommitActivity {
        let commits = self.in_window(commits);
        if commits.is_empty() {
            return CommitActivity::default();
        }

        let by_author = commits
            .iter()
            .counts_by(|commit| commit.author.clone())
            .into_iter()
            .sorted_by(|(a_name, a), (b_name, b)| b.cmp(a).then_with(|| a_name.cmp(b_name)))
            .collect::<IndexMap<_, _>>();
        let by_day = commits
            .iter()
            .map(|commit| commit.timestamp.format("%Y-%m-%d").to_string())
            .fold(BTreeMap::<String, usize>::new(), |mut acc, day| {
                *acc.entry(day).or_default() += 1;
                acc
            })
            .into_iter()
            .collect::<IndexMap<_, _>>();
        let peak_day = by_day
            .iter()
            .rev()
            .max_by_key(|(_, count)| **count)
            .map(|(date, count)| DailyCount {
                date: date.clone(),
                commits: *count,
            });

        let day_count = by_day.len();
        CommitActivity {
            total_commits: commits.len(),
            by_author,
            by_day,
            peak_day,
            average_per_day: ratio(commits.len() as f64, day_count as f64),
        }
    }

    pub fn code_changes(&self, commits: &[Commit]) -> CodeChangeStats {
        let commits = self.in_window(commits);
        let mut stats = CodeChangeStats::default();
        let mut by_author: BTreeMap<String, AuthorChanges> = BTreeMap::new();
        for commit in commits {
            stats.lines_added += commit.additions;
            stats.lines_deleted += commit.deletions;
            stats.files_changed += commit.files_changed;
            let author = by_author.entry(commit.author.clone()).or_default();
            author.commits += 1;
            author.lines_added += commit.additions;
            author.lines_deleted += commit.deletions;
        }
        stats.net_lines = stats.lines_added as i64 - stats.lines_deleted as i64;
        stats.by_author = by_author
            .into_iter()
            .sorted_by(|(a_name, a), (b_name, b)| {
                (b.lines_added + b.lines_deleted)
                    .cmp(&(a.lines_added + a.lines_deleted))
                    .then_with(|| a_name.cmp(b_name))
            })
            .collect();
        stats
    }

    pub fn pull_request_stats(&self, pull_requests: &[PullRequest]) -> PullRequestStats {
        if pull_requests.is_empty() {
            return PullRequestStats::default();
        }
        let total = pull_requests.len();
        let merged = pull_requests.iter().filter(|pr| pr.is_merged()).count();
        let closed_unmerged = pull_requests
            .iter()
            .filter(|pr| !pr.is_merged() && pr.closed_at.is_some())
            .count();
        let review_hours = pull_requests
            .iter()
            .filter_map(|pr| pr.first_review().map(|at| hours_between(pr.created_at, at)))
            .collect::<Vec<_>>();
        let merge_hours = pull_requests
            .iter()
            .filter_map(|pr| pr.merged_at.map(|at| hours_between(pr.created_at, at)))
            .collect::<Vec<_>>();
        let lines = pull_requests
            .iter()
            .map(|pr| pr.lines_changed() as f64)
            .collect::<Vec<_>>();

        PullRequestStats {
            total,
            merged,
            open: total - merged - closed_unmerged,
            closed_unmerged,
            merge_rate: ratio(merged as f64, total as f64),
            average_time_to_first_review_hours: mean(&review_hours),
            average_time_to_merge_hours: mean(&merge_hours),
            average_lines_changed: mean(&lines),
        }
    }

    pub fn review_stats(&self, pull_requests: &[PullRequest]) -> ReviewStats {
        let reviews = pull_requests
            .iter()
            .flat_map(|pr| &pr.reviews)
            .collect::<Vec<_>>();
        let count = |state: ReviewState| reviews.iter().filter(|r| r.state == state).count();

        ReviewStats {
            total_reviews: reviews.len(),
            approvals: count(ReviewState::Approved),
            changes_requested: count(ReviewState::ChangesRequested),
            comments: count(ReviewState::Commented),
            average_reviews_per_pr: ratio(reviews.len() as f64, pull_requests.len() as f64),
            by_reviewer: reviews
                .iter()
                .counts_by(|review| review.reviewer.clone())
                .into_iter()
                .sorted_by(|(a_name, a), (b_name, b)| b.cmp(a).then_with(|| a_name.cmp(b_name)))
                .collect(),
        }
    }

    pub fn enhanced_metrics(
        &self,
        issues: &[Issue],
        commits: &[Commit],
        pull_requests: &[PullRequest],
    ) -> EnhancedSourceControlMetrics {
        let scope = issues.iter().map(|issue| issue.key.clone()).collect::<Vec<_>>();
        let traceability = self.link(&scope, commits, pull_requests);
        let traced = scope
            .iter()
            .filter(|key| {
                traceability
                    .get(*key)
                    .is_some_and(|t| t.status == TraceabilityStatus::Complete)
            })
            .count();
        let range = self
            .window
            .map(|window| (window.since.date_naive(), window.until.date_naive()));

        EnhancedSourceControlMetrics {
            commit_activity: self.commit_activity(commits),
            code_changes: self.code_changes(commits),
            pull_requests: self.pull_request_stats(pull_requests),
            reviews: self.review_stats(pull_requests),
            traceability,
            traceability_coverage: percent(traced as f64, scope.len() as f64),
            monthly_activity: monthly_activity(commits, pull_requests, range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Review;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn commit(author: &str, message: &str, timestamp: DateTime<Utc>) -> Commit {
        Commit {
            sha: format!("{author}-{timestamp}"),
            author: author.to_string(),
            email: format!("{author}@example.com"),
            message: message.to_string(),
            timestamp,
            branch: None,
            files_changed: 1,
            additions: 10,
            deletions: 2,
        }
    }

    fn pull_request(number: u64, title: &str, branch: Option<&str>) -> PullRequest {
        PullRequest {
            number,
            title: title.to_string(),
            body: None,
            author: "dana".to_string(),
            source_branch: branch.map(String::from),
            created_at: at(2, 9),
            merged_at: None,
            closed_at: None,
            additions: 30,
            deletions: 5,
            commit_count: 2,
            first_review_at: None,
            reviews: Vec::new(),
            linked_issues: Vec::new(),
        }
    }

    fn window() -> SprintWindow {
        SprintWindow::new(at(1, 0), at(10, 0))
    }

    #[test]
    fn test_message_links_issue() {
        let engine = CorrelationEngine::new(Some(window()));
        let links = engine.link(&[], &[commit("dana", "Fix ABC-123 bug", at(2, 10))], &[]);

        assert_eq!(links.len(), 1);
        assert_eq!(links["ABC-123"].commit_count, 1);
        assert_eq!(links["ABC-123"].lines_changed, 12);
        assert_eq!(links["ABC-123"].status, TraceabilityStatus::Untraced);
    }

    #[test]
    fn test_message_without_key_links_nothing() {
        let engine = CorrelationEngine::new(Some(window()));
        let links = engine.link(&[], &[commit("dana", "tidy up", at(2, 10))], &[]);
        assert!(links.is_empty());
    }

    #[test]
    fn test_branch_heuristic_links_pull_request() {
        let engine = CorrelationEngine::new(Some(window()));
        let pr = pull_request(42, "Login page", Some("feature/ABC-123-x"));
        let links = engine.link(&["ABC-123".to_string(), "ABC-9".to_string()], &[], &[pr]);

        assert_eq!(links["ABC-123"].pull_requests, vec![42]);
        assert_eq!(links["ABC-123"].status, TraceabilityStatus::Complete);
        assert_eq!(links["ABC-9"].status, TraceabilityStatus::Untraced);
        assert_eq!(links.get_index(0).unwrap().0, "ABC-123");
    }

    #[test]
    fn test_title_and_branch_union_counts_pr_once() {
        let engine = CorrelationEngine::default();
        let pr = pull_request(5, "ABC-1: login", Some("ABC-1-login"));
        let links = engine.link(&[], &[], &[pr]);
        assert_eq!(links["ABC-1"].pull_requests, vec![5]);
        assert_eq!(links["ABC-1"].lines_changed, 35);
    }

    #[test]
    fn test_pull_request_counts_replace_its_commits() {
        let engine = CorrelationEngine::new(Some(window()));
        let mut pr = pull_request(5, "Login", Some("feature/ABC-1-login"));
        pr.commit_count = 3;
        pr.additions = 80;
        pr.deletions = 20;

        let links = engine.link(&[], &[], &[pr.clone()]);
        assert_eq!(links["ABC-1"].commit_count, 3);
        assert_eq!(links["ABC-1"].lines_changed, 100);

        let own_commit = commit("dana", "ABC-1 part", at(2, 10));
        let links = engine.link(&[], &[own_commit], &[pr]);
        assert_eq!(links["ABC-1"].commit_count, 3);
        assert_eq!(links["ABC-1"].lines_changed, 100);
    }

    #[test]
    fn test_commits_count_when_no_pull_request() {
        let engine = CorrelationEngine::new(Some(window()));
        let commits = vec![
            commit("dana", "ABC-2 first", at(2, 10)),
            commit("lee", "ABC-2 second", at(3, 10)),
        ];
        let links = engine.link(&["ABC-2".to_string()], &commits, &[]);
        assert_eq!(links["ABC-2"].commit_count, 2);
        assert_eq!(links["ABC-2"].lines_changed, 24);
        assert!(links["ABC-2"].pull_requests.is_empty());
    }

    #[test]
    fn test_commit_activity_respects_window() {
        let engine = CorrelationEngine::new(Some(window()));
        let commits = vec![
            commit("dana", "a", at(2, 9)),
            commit("dana", "b", at(2, 15)),
            commit("lee", "c", at(4, 9)),
            commit("lee", "outside", at(20, 9)),
        ];
        let activity = engine.commit_activity(&commits);

        assert_eq!(activity.total_commits, 3);
        assert_eq!(activity.by_author["dana"], 2);
        assert_eq!(activity.by_day.len(), 2);
        assert_eq!(activity.peak_day.unwrap().date, "2024-03-02");
        assert_eq!(activity.average_per_day, 1.5);
    }

    #[test]
    fn test_pull_request_stats_only_average_present_timestamps() {
        let engine = CorrelationEngine::default();
        let mut merged = pull_request(1, "a", None);
        merged.merged_at = Some(merged.created_at + Duration::hours(10));
        merged.reviews = vec![Review {
            reviewer: "lee".into(),
            state: ReviewState::Approved,
            submitted_at: merged.created_at + Duration::hours(4),
        }];
        let mut closed = pull_request(2, "b", None);
        closed.closed_at = Some(closed.created_at + Duration::hours(1));
        let open = pull_request(3, "c", None);

        let stats = engine.pull_request_stats(&[merged.clone(), closed, open]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.merged, 1);
        assert_eq!(stats.closed_unmerged, 1);
        assert_eq!(stats.open, 1);
        assert!((stats.merge_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.average_time_to_first_review_hours, 4.0);
        assert_eq!(stats.average_time_to_merge_hours, 10.0);

        let reviews = engine.review_stats(&[merged]);
        assert_eq!(reviews.approvals, 1);
        assert_eq!(reviews.average_reviews_per_pr, 1.0);
    }

    #[test]
    fn test_empty_inputs() {
        let engine = CorrelationEngine::new(Some(window()));
        let metrics = engine.enhanced_metrics(&[], &[], &[]);
        assert_eq!(metrics.commit_activity.total_commits, 0);
        assert_eq!(metrics.pull_requests.merge_rate, 0.0);
        assert_eq!(metrics.traceability_coverage, 0.0);
        assert_eq!(metrics.code_changes.net_lines, 0);
        assert_eq!(metrics.monthly_activity.len(), 1);
    }
}
