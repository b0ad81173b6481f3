use crate::correlation::issue_keys;
use crate::error::{ProviderError, ProviderResult};
use crate::model::{Commit, Issue, PullRequest, RepoRef, Sprint, SprintState, SprintWindow};
use crate::provider::{DataProvider, FetchLevel, GitHistory};
use async_trait::async_trait;
use itertools::Itertools;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provider backed by an exported data directory:
///
/// ```text
/// <root>/sprints.json                          all sprints, issues embedded
/// <root>/enhanced/<sprintId>.json              issues with change history
/// <root>/repos/<owner>/<repo>/commits.json
/// <root>/repos/<owner>/<repo>/pull_requests.json
/// ```
///
/// When a local clone is attached, commits come from its git history instead.
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    root: PathBuf,
    git: Option<GitHistory>,
}

// Create
impl SnapshotProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            git: None,
        }
    }

    pub fn with_git_history(mut self, path: impl Into<PathBuf>) -> Self {
        self.git = Some(GitHistory::new(path));
        self
    }
}

// Files
impl SnapshotProvider {
    async fn read_json<T: DeserializeOwned>(&self, relative: &Path) -> ProviderResult<T> {
        let path = self.root.join(relative);
        debug!("Reading {}", path.display());
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ProviderError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    async fn all_sprints(&self) -> ProviderResult<Vec<Sprint>> {
        self.read_json(Path::new("sprints.json")).await
    }

    fn repo_dir(repo: &RepoRef) -> PathBuf {
        Path::new("repos").join(&repo.owner).join(&repo.name)
    }
}

#[async_trait]
impl DataProvider for SnapshotProvider {
    async fn sprint(&self, sprint_id: u64) -> ProviderResult<Sprint> {
        self.all_sprints()
            .await?
            .into_iter()
            .find(|sprint| sprint.id == sprint_id)
            .ok_or_else(|| ProviderError::NotFound(format!("sprint {sprint_id}")))
    }

    async fn issues(&self, sprint_id: u64, level: FetchLevel) -> ProviderResult<Vec<Issue>> {
        if level == FetchLevel::Enhanced {
            let path = Path::new("enhanced").join(format!("{sprint_id}.json"));
            match self.read_json::<Vec<Issue>>(&path).await {
                Ok(issues) => return Ok(issues),
                Err(ProviderError::NotFound(_)) => {
                    debug!(sprint_id, "No enhanced export, using embedded issues");
                }
                Err(e) => return Err(e),
            }
        }
        let mut issues = self.sprint(sprint_id).await?.issues;
        if level == FetchLevel::Basic {
            issues.iter_mut().for_each(|issue| issue.history.clear());
        }
        Ok(issues)
    }

    async fn closed_sprints(&self, board_id: u64) -> ProviderResult<Vec<Sprint>> {
        Ok(self
            .all_sprints()
            .await?
            .iter()
            .filter(|sprint| sprint.board_id == board_id && sprint.state == SprintState::Closed)
            .map(Sprint::header)
            .collect())
    }

    async fn commits(&self, repo: &RepoRef, window: SprintWindow) -> ProviderResult<Vec<Commit>> {
        if let Some(git) = self.git.clone() {
            return tokio::task::spawn_blocking(move || git.commits(&window))
                .await
                .map_err(|e| ProviderError::Transport(e.to_string()))?
                .map_err(Into::into);
        }
        let commits: Vec<Commit> = self
            .read_json(&Self::repo_dir(repo).join("commits.json"))
            .await?;
        Ok(commits
            .into_iter()
            .filter(|commit| window.contains(&commit.timestamp))
            .collect())
    }

    async fn pull_requests(
        &self,
        repo: &RepoRef,
        window: SprintWindow,
        level: FetchLevel,
    ) -> ProviderResult<Vec<PullRequest>> {
        let pull_requests: Vec<PullRequest> = self
            .read_json(&Self::repo_dir(repo).join("pull_requests.json"))
            .await?;
        Ok(pull_requests
            .into_iter()
            .filter(|pr| pr.touches(&window))
            .map(|pr| match level {
                FetchLevel::Basic => strip_review_data(pr),
                FetchLevel::Enhanced => extract_linked_issues(pr),
            })
            .collect())
    }
}

fn strip_review_data(mut pr: PullRequest) -> PullRequest {
    pr.first_review_at = None;
    pr.reviews.clear();
    pr.linked_issues.clear();
    pr
}

fn extract_linked_issues(mut pr: PullRequest) -> PullRequest {
    let texts = [
        Some(pr.title.as_str()),
        pr.body.as_deref(),
        pr.source_branch.as_deref(),
    ];
    let found = texts.into_iter().flatten().flat_map(issue_keys).collect::<Vec<_>>();
    pr.linked_issues = pr
        .linked_issues
        .drain(..)
        .chain(found)
        .unique()
        .sorted()
        .collect();
    pr
}
