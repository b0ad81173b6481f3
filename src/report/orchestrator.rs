use crate::cache::{keys, CacheStore, JsonCache};
use crate::config::Config;
use crate::correlation::CorrelationEngine;
use crate::error::{Error, FetchTarget, ProviderError, ProviderResult, Result};
use crate::metrics::{
    cycle_times, ForecastAnalyzer, MetricsCalculator, SprintAnalyzer, Tier1Analyzer,
    Tier2Analyzer, Tier3Analyzer,
};
use crate::model::{Commit, Issue, PullRequest, RepoRef, Sprint, SprintWindow, StatusTable};
use crate::provider::{DataProvider, FetchLevel};
use crate::report::{Report, ReportRequest};
use crate::velocity::{SprintSample, VelocityAnalyzer, VelocityData};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Assembles a [`Report`] per request.
///
/// The sprint detail is fetched first. Everything else that depends on it
/// (issue history, commits, pull requests, the velocity window) is fetched
/// concurrently, and only once all of it has settled do the metric
/// calculators run.
pub struct SprintOrchestrator {
    provider: Arc<dyn DataProvider>,
    cache: JsonCache,
    velocity: VelocityAnalyzer,
    statuses: StatusTable,
    config: Config,
}

/// Outcome of an optional fetch: data, or the warning explaining its absence.
type Degradable<T> = std::result::Result<T, String>;

// Create
impl SprintOrchestrator {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        cache: Arc<dyn CacheStore>,
        config: Config,
    ) -> Result<Self> {
        let statuses = config.status_table()?;
        Ok(Self {
            velocity: VelocityAnalyzer::new(
                provider.clone(),
                cache.clone(),
                statuses.clone(),
                config.clone(),
            ),
            provider,
            cache: JsonCache::new(cache),
            statuses,
            config,
        })
    }
}

// Fetch
impl SprintOrchestrator {
    async fn sprint(&self, sprint_id: u64) -> Result<Sprint> {
        let key = keys::sprint(sprint_id);
        if let Some(sprint) = self.cache.get::<Sprint>(&key).await {
            return Ok(sprint);
        }
        let sprint = self
            .provider
            .sprint(sprint_id)
            .await
            .map_err(|e| Error::fetch(sprint_id, FetchTarget::Sprint, e))?;
        self.cache
            .set(&key, &sprint, self.config.cache.sprint_ttl(sprint.state))
            .await;
        Ok(sprint)
    }

    /// Primary issue list. The basic list embedded in the sprint detail is
    /// used as is; the enhanced list is a separate, separately cached fetch.
    async fn issues(&self, sprint: &Sprint, level: FetchLevel) -> Result<Vec<Issue>> {
        if level == FetchLevel::Basic && !sprint.issues.is_empty() {
            return Ok(sprint.issues.clone());
        }
        let key = keys::sprint_issues(sprint.id, level);
        if let Some(issues) = self.cache.get::<Vec<Issue>>(&key).await {
            return Ok(issues);
        }
        let issues = self
            .provider
            .issues(sprint.id, level)
            .await
            .map_err(|e| Error::fetch(sprint.id, FetchTarget::Issues, e))?;
        self.cache
            .set(&key, &issues, self.config.cache.sprint_ttl(sprint.state))
            .await;
        Ok(issues)
    }

    async fn commits(&self, request: &ReportRequest, sprint: &Sprint) -> Degradable<Vec<Commit>> {
        if !request.sections.needs_commits() {
            return Ok(Vec::new());
        }
        let (repo, window) = source_control_target(request, sprint, "commits")?;
        self.provider
            .commits(repo, window)
            .await
            .map_err(|e| degraded(format!("commits for {repo}"), e))
    }

    async fn pull_requests(
        &self,
        request: &ReportRequest,
        sprint: &Sprint,
    ) -> Degradable<Vec<PullRequest>> {
        if !request.sections.needs_pull_requests() {
            return Ok(Vec::new());
        }
        let (repo, window) = source_control_target(request, sprint, "pull requests")?;
        let level = if request.sections.include_enhanced_source_control {
            FetchLevel::Enhanced
        } else {
            FetchLevel::Basic
        };
        self.provider
            .pull_requests(repo, window, level)
            .await
            .map_err(|e| degraded(format!("{level} pull requests for {repo}"), e))
    }

    async fn velocity_window(
        &self,
        request: &ReportRequest,
        sprint: &Sprint,
    ) -> Option<Degradable<Vec<SprintSample>>> {
        if !request.sections.needs_velocity_window() {
            return None;
        }
        let count = request
            .sprint_count
            .unwrap_or(self.config.velocity.default_sprint_count);
        let board = sprint.board_id;
        Some(
            self.velocity
                .load_window(board, count)
                .await
                .map_err(|e| degraded(format!("velocity history for board {board}"), e)),
        )
    }

    /// Cycle-time sample of the sprint before `sprint`, taken from enhanced
    /// history so both samples measure from the first in-progress transition.
    async fn previous_cycle_times(
        &self,
        window: &[SprintSample],
        sprint: &Sprint,
    ) -> Option<Degradable<Vec<f64>>> {
        let previous = VelocityAnalyzer::previous_sprint(window, sprint)?;
        Some(
            self.issues(&previous.sprint, FetchLevel::Enhanced)
                .await
                .map(|issues| cycle_times(&issues, &self.statuses))
                .map_err(|e| format!("cycle-time baseline skipped: {e}")),
        )
    }
}

fn source_control_target<'a>(
    request: &'a ReportRequest,
    sprint: &Sprint,
    what: &str,
) -> Degradable<(&'a RepoRef, SprintWindow)> {
    let repo = request
        .repo
        .as_ref()
        .ok_or_else(|| format!("{what} skipped: no repository given"))?;
    let window = sprint
        .window()
        .ok_or_else(|| format!("{what} skipped: sprint {} has no start/end dates", sprint.id))?;
    Ok((repo, window))
}

fn degraded(what: String, error: ProviderError) -> String {
    format!("failed to fetch {what}: {error}")
}

fn settle<T: Default>(outcome: Degradable<T>, warnings: &mut Vec<String>) -> T {
    outcome.unwrap_or_else(|warning| {
        warn!("{}", warning);
        warnings.push(warning);
        T::default()
    })
}

// Generate
impl SprintOrchestrator {
    pub async fn generate_report(&self, request: &ReportRequest) -> Result<Report> {
        let seconds = self.config.report.timeout_secs;
        tokio::time::timeout(Duration::from_secs(seconds), self.assemble(request))
            .await
            .map_err(|_| Error::Timeout {
                sprint_id: request.sprint_id,
                seconds,
            })?
    }

    async fn assemble(&self, request: &ReportRequest) -> Result<Report> {
        let sections = request.sections;
        let sprint = self.sprint(request.sprint_id).await?;
        let level = if sections.needs_enhanced_issues() {
            FetchLevel::Enhanced
        } else {
            FetchLevel::Basic
        };
        info!(sprint_id = sprint.id, %level, "fetching report inputs");

        let (issues, commits, pull_requests, window) = futures::join!(
            self.issues(&sprint, level),
            self.commits(request, &sprint),
            self.pull_requests(request, &sprint),
            self.velocity_window(request, &sprint),
        );
        let issues = issues?;

        let mut warnings = Vec::new();
        let commits = settle(commits, &mut warnings);
        let pull_requests = settle(pull_requests, &mut warnings);
        let window = window.map(|window| settle(window, &mut warnings));
        debug!(
            issues = issues.len(),
            commits = commits.len(),
            pull_requests = pull_requests.len(),
            "report inputs ready"
        );

        let as_of = request.as_of.unwrap_or_else(|| sprint.as_of(Utc::now()));
        let calc = MetricsCalculator::new(&sprint, &issues, &self.statuses, &self.config, as_of);
        let history = window
            .as_deref()
            .map(|window| self.velocity.velocity_data(window));
        let previous_cycle_times = match (sections.include_tier2, window.as_deref()) {
            (true, Some(window)) => self
                .previous_cycle_times(window, &sprint)
                .await
                .map(|outcome| settle(outcome, &mut warnings)),
            _ => None,
        };

        Ok(Report {
            sprint: sprint.header(),
            as_of,
            metrics: calc.sprint_metrics(),
            velocity: sections
                .include_velocity
                .then(|| history.clone().unwrap_or_default()),
            team_performance: sections.include_velocity.then(|| {
                window
                    .as_deref()
                    .map(|window| self.velocity.team_performance(window))
                    .unwrap_or_default()
            }),
            issue_type_distribution: sections.include_velocity.then(|| {
                window
                    .as_deref()
                    .map(|window| self.velocity.issue_type_distribution(window))
                    .unwrap_or_default()
            }),
            burndown: sections.include_burndown.then(|| calc.burndown()),
            tier1: sections.include_tier1.then(|| calc.tier1()),
            tier2: sections
                .include_tier2
                .then(|| calc.tier2(previous_cycle_times.as_deref(), &request.capacity)),
            tier3: sections.include_tier3.then(|| calc.tier3()),
            forward_looking: sections
                .include_forward_looking
                .then(|| calc.forward_looking(history.as_ref())),
            enhanced_source_control: sections.include_enhanced_source_control.then(|| {
                CorrelationEngine::new(sprint.window()).enhanced_metrics(
                    &issues,
                    &commits,
                    &pull_requests,
                )
            }),
            commits: sections.include_commits.then_some(commits),
            pull_requests: sections.include_pull_requests.then_some(pull_requests),
            warnings,
        })
    }
}

impl SprintOrchestrator {
    /// Cache-backed velocity for a board, outside of a full report.
    pub async fn velocity(&self, board_id: u64, count: usize) -> ProviderResult<VelocityData> {
        self.velocity.velocity(board_id, count).await
    }
}
