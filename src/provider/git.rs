use crate::model::{Commit, SprintWindow};
use chrono::{DateTime, Utc};
use git2::{DiffFindOptions, DiffOptions, DiffStats, Error, Repository};
use std::path::PathBuf;

/// Commit history read straight from a local clone.
#[derive(Debug, Clone)]
pub struct GitHistory {
    path: PathBuf,
}

impl GitHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Commits reachable from HEAD authored inside `window`, newest first.
    pub fn commits(&self, window: &SprintWindow) -> Result<Vec<Commit>, Error> {
        let repo = Repository::open(&self.path)?;
        let git_commits = commits_in_window(&repo, window)?;
        let mut commits = git_commits
            .iter()
            .map(|git_commit| {
                let stats = commit_stats(&repo, git_commit)?;
                Ok(git_commit_to_commit(git_commit, &stats))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(commits)
    }
}

fn commit_time(commit: &git2::Commit<'_>) -> DateTime<Utc> {
    DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or_default()
}

fn commits_in_window<'a>(
    repo: &'a Repository,
    window: &SprintWindow,
) -> Result<Vec<git2::Commit<'a>>, Error> {
    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;
    let commits = revwalk
        .filter_map(|id| repo.find_commit(id.ok()?).ok())
        .filter(|commit| window.contains(&commit_time(commit)))
        .collect();
    Ok(commits)
}

fn commit_stats(repo: &Repository, commit: &git2::Commit<'_>) -> Result<DiffStats, Error> {
    let mut diff_options = DiffOptions::new();
    diff_options.patience(true);
    diff_options.include_typechange(true);
    let mut diff_find_options = DiffFindOptions::new();
    diff_find_options.renames(true);
    let old_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };
    let mut diff = repo.diff_tree_to_tree(
        old_tree.as_ref(),
        Some(&commit.tree()?),
        Some(&mut diff_options),
    )?;
    diff.find_similar(Some(&mut diff_find_options))?;
    diff.stats()
}

fn git_commit_to_commit(git_commit: &git2::Commit<'_>, stats: &DiffStats) -> Commit {
    let author = git_commit.author();
    Commit {
        sha: git_commit.id().to_string(),
        author: author.name().unwrap_or("unknown").to_string(),
        email: author.email().unwrap_or("").to_string(),
        message: git_commit.message().unwrap_or("").to_string(),
        timestamp: commit_time(git_commit),
        branch: None,
        files_changed: stats.files_changed(),
        additions: stats.insertions(),
        deletions: stats.deletions(),
    }
}
