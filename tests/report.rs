use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sprint_analytics::cache::{CacheStore, MemoryCache};
use sprint_analytics::correlation::TraceabilityStatus;
use sprint_analytics::error::{FetchTarget, ProviderError, ProviderResult};
use sprint_analytics::model::{
    Commit, Issue, IssueChange, PullRequest, RepoRef, Sprint, SprintState, SprintWindow,
};
use sprint_analytics::provider::{DataProvider, FetchLevel};
use sprint_analytics::report::MarkdownReport;
use sprint_analytics::velocity::Trend;
use sprint_analytics::{Config, Error, ReportRequest, ReportSections, SprintOrchestrator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const BOARD: u64 = 7;

fn day(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, 9, 0, 0).unwrap()
}

/// Eight of ten issues done, 50 of 60 points.
fn current_issues() -> Vec<Issue> {
    let created = day(2, 20);
    let mut issues = (1..=8)
        .map(|i| {
            let points = if i <= 2 { 7.0 } else { 6.0 };
            let mut issue = Issue::new(format!("ABC-{i}"), "Story", "Done", Some(points), created);
            issue.resolved = Some(day(3, 10));
            issue
        })
        .collect::<Vec<_>>();
    let mut blocked = Issue::new("ABC-9", "Story", "In Progress", Some(5.0), created);
    blocked.flagged = true;
    blocked.flagged_at = Some(day(3, 4));
    blocked.priority = Some("High".to_string());
    issues.push(blocked);
    issues.push(Issue::new("ABC-10", "Bug", "To Do", Some(5.0), created));
    issues
}

fn closed_sprint(id: u64, start: DateTime<Utc>, done_points: f64) -> Sprint {
    let issues = [
        Issue::new(format!("OLD-{id}1"), "Story", "Done", Some(done_points), start),
        Issue::new(format!("OLD-{id}2"), "Task", "Closed", Some(3.0), start),
    ]
    .into_iter()
    .map(|mut issue| {
        issue.history = vec![IssueChange {
            at: start + Duration::days(3),
            author: None,
            field: "status".to_string(),
            from: Some("To Do".to_string()),
            to: Some("In Progress".to_string()),
        }];
        issue.resolved = Some(start + Duration::days(5));
        issue
    })
    .collect();
    Sprint::new(
        id,
        BOARD,
        format!("Sprint {id}"),
        SprintState::Closed,
        Some(start),
        Some(start + Duration::days(13)),
    )
    .with_issues(issues)
}

#[derive(Default)]
struct FakeProvider {
    sprints: Vec<Sprint>,
    commits: Vec<Commit>,
    pull_requests: Vec<PullRequest>,
    fail_issues: bool,
    fail_pull_requests: bool,
    delay: Option<std::time::Duration>,
    sprint_fetches: AtomicUsize,
    enhanced_fetches: AtomicUsize,
    basic_fetches: AtomicUsize,
    list_fetches: AtomicUsize,
}

impl FakeProvider {
    fn board() -> Self {
        let current = Sprint::new(
            100,
            BOARD,
            "Sprint 100",
            SprintState::Closed,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 3, 14, 23, 59, 59).unwrap()),
        )
        .with_goal("Ship login")
        .with_issues(current_issues());
        Self {
            sprints: vec![
                closed_sprint(98, day(2, 1), 47.0),
                closed_sprint(99, day(2, 16), 47.0),
                current,
            ],
            ..Self::default()
        }
    }

    fn with_source_control(mut self) -> Self {
        self.commits = vec![Commit {
            sha: "c0ffee".to_string(),
            author: "dana".to_string(),
            email: "dana@example.com".to_string(),
            message: "Fix ABC-2 bug".to_string(),
            timestamp: day(3, 5),
            branch: None,
            files_changed: 2,
            additions: 10,
            deletions: 4,
        }];
        self.pull_requests = vec![PullRequest {
            number: 5,
            title: "Login form".to_string(),
            body: None,
            author: "dana".to_string(),
            source_branch: Some("feature/ABC-1-login".to_string()),
            created_at: day(3, 4),
            merged_at: Some(day(3, 6)),
            closed_at: Some(day(3, 6)),
            additions: 120,
            deletions: 8,
            commit_count: 3,
            first_review_at: Some(day(3, 5)),
            reviews: Vec::new(),
            linked_issues: Vec::new(),
        }];
        self
    }

    fn find(&self, sprint_id: u64) -> ProviderResult<Sprint> {
        self.sprints
            .iter()
            .find(|sprint| sprint.id == sprint_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("sprint {sprint_id}")))
    }
}

#[async_trait]
impl DataProvider for FakeProvider {
    async fn sprint(&self, sprint_id: u64) -> ProviderResult<Sprint> {
        self.sprint_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.find(sprint_id)
    }

    async fn issues(&self, sprint_id: u64, level: FetchLevel) -> ProviderResult<Vec<Issue>> {
        match level {
            FetchLevel::Basic => self.basic_fetches.fetch_add(1, Ordering::SeqCst),
            FetchLevel::Enhanced => self.enhanced_fetches.fetch_add(1, Ordering::SeqCst),
        };
        if self.fail_issues {
            return Err(ProviderError::Transport("issue tracker unreachable".to_string()));
        }
        let mut issues = self.find(sprint_id)?.issues;
        if level == FetchLevel::Basic {
            issues.iter_mut().for_each(|issue| issue.history.clear());
        }
        Ok(issues)
    }

    async fn closed_sprints(&self, board_id: u64) -> ProviderResult<Vec<Sprint>> {
        self.list_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .sprints
            .iter()
            .filter(|sprint| sprint.board_id == board_id && sprint.state == SprintState::Closed)
            .map(Sprint::header)
            .collect())
    }

    async fn commits(&self, _repo: &RepoRef, window: SprintWindow) -> ProviderResult<Vec<Commit>> {
        Ok(self
            .commits
            .iter()
            .filter(|commit| window.contains(&commit.timestamp))
            .cloned()
            .collect())
    }

    async fn pull_requests(
        &self,
        _repo: &RepoRef,
        window: SprintWindow,
        _level: FetchLevel,
    ) -> ProviderResult<Vec<PullRequest>> {
        if self.fail_pull_requests {
            return Err(ProviderError::Transport("rate limited".to_string()));
        }
        Ok(self
            .pull_requests
            .iter()
            .filter(|pr| pr.touches(&window))
            .cloned()
            .collect())
    }
}

fn orchestrator(provider: Arc<FakeProvider>, cache: Arc<dyn CacheStore>) -> SprintOrchestrator {
    SprintOrchestrator::new(provider, cache, Config::default()).unwrap()
}

fn repo() -> RepoRef {
    RepoRef::new("acme", "web")
}

#[tokio::test]
async fn test_unrequested_sections_are_absent() {
    let provider = Arc::new(FakeProvider::board());
    let sections = ReportSections {
        include_burndown: true,
        ..ReportSections::default()
    };
    let report = orchestrator(provider, Arc::new(MemoryCache::new()))
        .generate_report(&ReportRequest::new(100, sections))
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    let object = json.as_object().unwrap();
    assert!(object.contains_key("burndown"));
    assert!(object.contains_key("metrics"));
    assert!(object.contains_key("warnings"));
    for absent in [
        "commits",
        "pullRequests",
        "velocity",
        "teamPerformance",
        "issueTypeDistribution",
        "tier1",
        "tier2",
        "tier3",
        "forwardLooking",
        "enhancedSourceControl",
    ] {
        assert!(!object.contains_key(absent), "{absent} should be omitted");
    }
    assert!(object["sprint"]["issues"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_ten_issue_sprint_metrics() {
    let provider = Arc::new(FakeProvider::board());
    let report = orchestrator(provider, Arc::new(MemoryCache::new()))
        .generate_report(&ReportRequest::new(100, ReportSections::default()))
        .await
        .unwrap();

    assert_eq!(report.metrics.total_issues, 10);
    assert_eq!(report.metrics.completion_rate, 80.0);
    assert_eq!(report.metrics.velocity, 50.0);
    assert_eq!(report.metrics.spillover_percentage, 16.67);
    assert!(report.metrics.completed_story_points <= report.metrics.total_story_points);
    assert_eq!(report.as_of, Utc.with_ymd_and_hms(2024, 3, 14, 23, 59, 59).unwrap());
}

#[tokio::test]
async fn test_missing_sprint_is_fatal() {
    let provider = Arc::new(FakeProvider::board());
    let result = orchestrator(provider, Arc::new(MemoryCache::new()))
        .generate_report(&ReportRequest::new(404, ReportSections::all()))
        .await;

    match result {
        Err(Error::Fetch {
            sprint_id, target, ..
        }) => {
            assert_eq!(sprint_id, 404);
            assert_eq!(target, FetchTarget::Sprint);
        }
        other => panic!("expected sprint fetch failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_enhanced_issue_failure_is_fatal() {
    let provider = Arc::new(FakeProvider {
        fail_issues: true,
        ..FakeProvider::board()
    });
    let sections = ReportSections {
        include_tier1: true,
        ..ReportSections::default()
    };
    let result = orchestrator(provider, Arc::new(MemoryCache::new()))
        .generate_report(&ReportRequest::new(100, sections))
        .await;

    assert!(matches!(
        result,
        Err(Error::Fetch {
            target: FetchTarget::Issues,
            ..
        })
    ));
}

#[tokio::test]
async fn test_pull_request_failure_degrades() {
    let provider = Arc::new(FakeProvider {
        fail_pull_requests: true,
        ..FakeProvider::board().with_source_control()
    });
    let sections = ReportSections {
        include_commits: true,
        include_pull_requests: true,
        ..ReportSections::default()
    };
    let report = orchestrator(provider, Arc::new(MemoryCache::new()))
        .generate_report(&ReportRequest::new(100, sections).with_repo(repo()))
        .await
        .unwrap();

    assert_eq!(report.commits.as_ref().map(Vec::len), Some(1));
    assert_eq!(report.pull_requests, Some(Vec::new()));
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("pull requests for acme/web"));
}

#[tokio::test]
async fn test_missing_repo_is_a_warning() {
    let provider = Arc::new(FakeProvider::board().with_source_control());
    let sections = ReportSections {
        include_commits: true,
        ..ReportSections::default()
    };
    let report = orchestrator(provider, Arc::new(MemoryCache::new()))
        .generate_report(&ReportRequest::new(100, sections))
        .await
        .unwrap();

    assert_eq!(report.commits, Some(Vec::new()));
    assert_eq!(report.warnings, vec!["commits skipped: no repository given".to_string()]);
}

#[tokio::test]
async fn test_enhanced_fetch_only_for_tiers() {
    let provider = Arc::new(FakeProvider::board());
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
    let sections = ReportSections {
        include_velocity: true,
        include_burndown: true,
        ..ReportSections::default()
    };
    orchestrator(provider.clone(), cache.clone())
        .generate_report(&ReportRequest::new(100, sections))
        .await
        .unwrap();
    assert_eq!(provider.enhanced_fetches.load(Ordering::SeqCst), 0);

    let sections = ReportSections {
        include_tier3: true,
        ..ReportSections::default()
    };
    orchestrator(provider.clone(), cache)
        .generate_report(&ReportRequest::new(100, sections))
        .await
        .unwrap();
    assert_eq!(provider.enhanced_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_warm_cache_is_idempotent() {
    let provider = Arc::new(FakeProvider::board().with_source_control());
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
    let request = ReportRequest::new(100, ReportSections::all()).with_repo(repo());

    let first = orchestrator(provider.clone(), cache.clone())
        .generate_report(&request)
        .await
        .unwrap();
    let fetches = (
        provider.sprint_fetches.load(Ordering::SeqCst),
        provider.enhanced_fetches.load(Ordering::SeqCst),
        provider.basic_fetches.load(Ordering::SeqCst),
        provider.list_fetches.load(Ordering::SeqCst),
    );
    // Enhanced history for the current sprint and its cycle-time baseline.
    assert_eq!(fetches, (1, 2, 3, 1));

    let second = orchestrator(provider.clone(), cache)
        .generate_report(&request)
        .await
        .unwrap();
    assert_eq!(
        (
            provider.sprint_fetches.load(Ordering::SeqCst),
            provider.enhanced_fetches.load(Ordering::SeqCst),
            provider.basic_fetches.load(Ordering::SeqCst),
            provider.list_fetches.load(Ordering::SeqCst),
        ),
        fetches
    );
    assert_eq!(first.tier1, second.tier1);
    assert_eq!(first.tier2, second.tier2);
    assert_eq!(first.tier3, second.tier3);
    assert_eq!(first.forward_looking, second.forward_looking);
    assert_eq!(first.velocity, second.velocity);
    assert!(first.warnings.is_empty());
}

#[tokio::test]
async fn test_velocity_window_and_forecast() {
    let provider = Arc::new(FakeProvider::board());
    let sections = ReportSections {
        include_velocity: true,
        include_forward_looking: true,
        include_tier2: true,
        ..ReportSections::default()
    };
    let mut request = ReportRequest::new(100, sections);
    request.sprint_count = Some(10);
    let report = orchestrator(provider, Arc::new(MemoryCache::new()))
        .generate_report(&request)
        .await
        .unwrap();

    let velocity = report.velocity.unwrap();
    assert_eq!(velocity.sprints.len(), 3);
    assert_eq!(velocity.sprints[0].sprint_id, 100);
    assert_eq!(velocity.trend, Trend::Stable);
    assert_eq!(report.team_performance.unwrap().len(), 3);

    let forecast = report.forward_looking.unwrap();
    assert_eq!(forecast.carryover.items.len(), 2);
    assert_eq!(forecast.carryover.total_story_points, 10.0);
    assert!(forecast.next_sprint_forecast.forecasted_velocity > 0.0);

    let tier2 = report.tier2.unwrap();
    assert_eq!(tier2.blockers.len(), 1);
    assert!(tier2.cycle_time.improvement_percentage.is_some());
}

#[tokio::test]
async fn test_cycle_time_baseline_uses_enhanced_history() {
    let provider = Arc::new(FakeProvider::board());
    let sections = ReportSections {
        include_tier2: true,
        ..ReportSections::default()
    };
    let report = orchestrator(provider.clone(), Arc::new(MemoryCache::new()))
        .generate_report(&ReportRequest::new(100, sections))
        .await
        .unwrap();

    // Current issues take 19 days from creation; sprint 99 took 2 days from
    // its in-progress transition, which basic issue lists do not carry.
    let cycle = report.tier2.unwrap().cycle_time;
    assert_eq!(cycle.average_days, 19.0);
    assert_eq!(cycle.improvement_percentage, Some(-850.0));
    assert_eq!(provider.enhanced_fetches.load(Ordering::SeqCst), 2);
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn test_markdown_summary_renders_sections() {
    let provider = Arc::new(FakeProvider::board());
    let report = orchestrator(provider, Arc::new(MemoryCache::new()))
        .generate_report(&ReportRequest::new(100, ReportSections::all()))
        .await
        .unwrap();

    let markdown = report.to_markdown().unwrap();
    assert!(markdown.starts_with("# Sprint 100"));
    assert!(markdown.contains("## Summary"));
    assert!(markdown.contains("## Next sprint"));
    assert!(markdown.contains("Ship login"));
}

#[tokio::test]
async fn test_source_control_traceability() {
    let provider = Arc::new(FakeProvider::board().with_source_control());
    let sections = ReportSections {
        include_enhanced_source_control: true,
        ..ReportSections::default()
    };
    let report = orchestrator(provider, Arc::new(MemoryCache::new()))
        .generate_report(&ReportRequest::new(100, sections).with_repo(repo()))
        .await
        .unwrap();

    let metrics = report.enhanced_source_control.unwrap();
    let by_branch = &metrics.traceability["ABC-1"];
    assert_eq!(by_branch.status, TraceabilityStatus::Complete);
    assert_eq!(by_branch.pull_requests, vec![5]);
    assert_eq!(by_branch.commit_count, 3);
    assert_eq!(by_branch.lines_changed, 128);
    let by_message = &metrics.traceability["ABC-2"];
    assert_eq!(by_message.commit_count, 1);
    assert_eq!(by_message.status, TraceabilityStatus::Untraced);
    assert_eq!(metrics.traceability_coverage, 10.0);
    assert_eq!(metrics.monthly_activity.len(), 1);
    assert!(report.commits.is_none());
}

#[tokio::test]
async fn test_slow_fetch_times_out() {
    let provider = Arc::new(FakeProvider {
        delay: Some(std::time::Duration::from_millis(500)),
        ..FakeProvider::board()
    });
    let mut config = Config::default();
    config.report.timeout_secs = 0;
    let orchestrator =
        SprintOrchestrator::new(provider, Arc::new(MemoryCache::new()), config).unwrap();

    let result = orchestrator
        .generate_report(&ReportRequest::new(100, ReportSections::default()))
        .await;
    assert!(matches!(result, Err(Error::Timeout { sprint_id: 100, .. })));
}
