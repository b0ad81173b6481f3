mod utils;

use crate::utils::ProgressBarNew;
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use sprint_analytics::cache::MemoryCache;
use sprint_analytics::model::RepoRef;
use sprint_analytics::provider::SnapshotProvider;
use sprint_analytics::report::MarkdownReport;
use sprint_analytics::{Config, ReportRequest, ReportSections, SprintOrchestrator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Sprint analytics report generator")]
struct Args {
    /// Snapshot directory holding `sprints.json` and friends.
    #[arg(long = "data", default_value = "data")]
    data_path: PathBuf,
    #[arg(long = "sprint")]
    sprint_id: u64,
    #[arg(long = "config")]
    config_path: Option<PathBuf>,
    /// Repository coordinates as `owner/name`.
    #[arg(long = "repo")]
    repo: Option<RepoRef>,
    /// Local clone to read commit history from instead of the snapshot.
    #[arg(long = "git-repo")]
    git_repo_path: Option<PathBuf>,
    #[arg(long = "sprint-count")]
    sprint_count: Option<usize>,

    #[arg(long)]
    commits: bool,
    #[arg(long = "pull-requests")]
    pull_requests: bool,
    #[arg(long)]
    velocity: bool,
    #[arg(long)]
    burndown: bool,
    #[arg(long)]
    tier1: bool,
    #[arg(long)]
    tier2: bool,
    #[arg(long)]
    tier3: bool,
    #[arg(long = "forward-looking")]
    forward_looking: bool,
    #[arg(long = "source-control")]
    source_control: bool,
    /// Every section.
    #[arg(long)]
    all: bool,

    /// Write the JSON report here instead of stdout.
    #[arg(long = "output")]
    output_path: Option<PathBuf>,
    /// Also write a markdown summary.
    #[arg(long = "markdown")]
    markdown_path: Option<PathBuf>,
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn sections(&self) -> ReportSections {
        if self.all {
            return ReportSections::all();
        }
        ReportSections {
            include_commits: self.commits,
            include_pull_requests: self.pull_requests,
            include_velocity: self.velocity,
            include_burndown: self.burndown,
            include_tier1: self.tier1,
            include_tier2: self.tier2,
            include_tier3: self.tier3,
            include_forward_looking: self.forward_looking,
            include_enhanced_source_control: self.source_control,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(&args).await
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

async fn run(args: &Args) -> Result<()> {
    let config = match &args.config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config `{}`", path.display()))?,
        None => Config::default(),
    };

    let mut provider = SnapshotProvider::new(&args.data_path);
    if let Some(path) = &args.git_repo_path {
        provider = provider.with_git_history(path);
    }
    let orchestrator =
        SprintOrchestrator::new(Arc::new(provider), Arc::new(MemoryCache::new()), config)?;

    let mut request = ReportRequest::new(args.sprint_id, args.sections());
    request.repo = args.repo.clone();
    request.sprint_count = args.sprint_count;

    let pb = ProgressBar::spinner_with_message(format!(
        "Generating report for sprint {} ...",
        args.sprint_id
    ));
    let report = orchestrator.generate_report(&request).await;
    pb.finish_and_clear();
    let report = report
        .with_context(|| format!("Failed to generate report for sprint {}", args.sprint_id))?;
    info!(
        sprint_id = report.sprint.id,
        warnings = report.warnings.len(),
        "report generated"
    );

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output_path {
        Some(path) => tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write `{}`", path.display()))?,
        None => println!("{json}"),
    }
    if let Some(path) = &args.markdown_path {
        tokio::fs::write(path, report.to_markdown()?)
            .await
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
    }
    Ok(())
}
