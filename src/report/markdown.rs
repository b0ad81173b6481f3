use crate::correlation::EnhancedSourceControlMetrics;
use crate::error::{Error, Result};
use crate::metrics::{ForwardLooking, SprintMetrics, Tier1Metrics, Tier2Metrics, Tier3Metrics};
use crate::report::Report;
use crate::velocity::{SprintPerformance, VelocityData};
use markdown_builder::Markdown;
use markdown_table::{Heading, HeadingAlignment, MarkdownTable};

pub trait MarkdownReport {
    fn to_markdown(&self) -> Result<String>;
}

impl MarkdownReport for Report {
    fn to_markdown(&self) -> Result<String> {
        let mut doc = Markdown::new();

        let dates = match (self.sprint.start_date, self.sprint.end_date) {
            (Some(since), Some(until)) => format!(
                " ({} - {})",
                since.format("%d.%m.%Y"),
                until.format("%d.%m.%Y")
            ),
            _ => String::new(),
        };
        doc.header1(format!("{}{}", self.sprint.name, dates));
        if let Some(goal) = &self.sprint.goal {
            doc.paragraph(format!("*{goal}*"));
        }

        doc.add_metrics(&self.metrics)?;
        if let Some(velocity) = &self.velocity {
            doc.add_velocity(velocity, self.team_performance.as_deref().unwrap_or_default())?;
        }
        if let Some(tier1) = &self.tier1 {
            doc.add_tier1(tier1)?;
        }
        if let Some(tier2) = &self.tier2 {
            doc.add_tier2(tier2)?;
        }
        if let Some(tier3) = &self.tier3 {
            doc.add_tier3(tier3)?;
        }
        if let Some(forward) = &self.forward_looking {
            doc.add_forward_looking(forward);
        }
        if let Some(source_control) = &self.enhanced_source_control {
            doc.add_source_control(source_control)?;
        }
        if !self.warnings.is_empty() {
            doc.header2("Warnings");
            doc.paragraph(bullets(&self.warnings));
        }

        Ok(doc.render())
    }
}

fn bullets(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn table(headings: &[&str], rows: Vec<Vec<String>>) -> Result<String> {
    let headings = headings
        .iter()
        .enumerate()
        .map(|(i, heading)| {
            let alignment = if i == 0 {
                HeadingAlignment::Left
            } else {
                HeadingAlignment::Right
            };
            Heading::new(heading.to_string(), Some(alignment))
        })
        .collect::<Vec<_>>();
    let mut md_table = MarkdownTable::new(rows);
    md_table.with_headings(headings);
    md_table
        .as_markdown()
        .map_err(|e| Error::Render(format!("{e:?}")))
}

trait MarkdownExt {
    fn add_metrics(&mut self, metrics: &SprintMetrics) -> Result<()>;
    fn add_velocity(
        &mut self,
        velocity: &VelocityData,
        performance: &[SprintPerformance],
    ) -> Result<()>;
    fn add_tier1(&mut self, tier1: &Tier1Metrics) -> Result<()>;
    fn add_tier2(&mut self, tier2: &Tier2Metrics) -> Result<()>;
    fn add_tier3(&mut self, tier3: &Tier3Metrics) -> Result<()>;
    fn add_forward_looking(&mut self, forward: &ForwardLooking);
    fn add_source_control(&mut self, metrics: &EnhancedSourceControlMetrics) -> Result<()>;
}

impl MarkdownExt for Markdown {
    fn add_metrics(&mut self, metrics: &SprintMetrics) -> Result<()> {
        self.header2("Summary");
        let rows = vec![
            vec![
                "Issues".to_string(),
                format!("{} / {}", metrics.completed_issues, metrics.total_issues),
            ],
            vec![
                "Story points".to_string(),
                format!(
                    "{} / {}",
                    metrics.completed_story_points, metrics.total_story_points
                ),
            ],
            vec![
                "Completion rate".to_string(),
                format!("{:.1}%", metrics.completion_rate),
            ],
            vec!["Velocity".to_string(), format!("{}", metrics.velocity)],
            vec![
                "Spillover".to_string(),
                format!("{:.1}%", metrics.spillover_percentage),
            ],
        ];
        self.paragraph(table(&["", "Value"], rows)?);

        let rows = metrics
            .by_type
            .iter()
            .map(|(issue_type, breakdown)| {
                vec![
                    issue_type.clone(),
                    format!("{}", breakdown.count),
                    format!("{}", breakdown.completed),
                    format!("{}", breakdown.story_points),
                ]
            })
            .collect::<Vec<_>>();
        if !rows.is_empty() {
            self.paragraph(table(&["Type", "Issues", "Done", "Points"], rows)?);
        }
        Ok(())
    }

    fn add_velocity(
        &mut self,
        velocity: &VelocityData,
        performance: &[SprintPerformance],
    ) -> Result<()> {
        self.header2(format!(
            "Velocity (average {:.1}, {})",
            velocity.average_velocity, velocity.trend
        ));
        let rows = performance
            .iter()
            .map(|sprint| {
                vec![
                    sprint.name.clone(),
                    format!("{}", sprint.planned_points),
                    format!("{}", sprint.velocity),
                    format!("{}", sprint.completed_issues),
                ]
            })
            .collect::<Vec<_>>();
        if !rows.is_empty() {
            self.paragraph(table(&["Sprint", "Planned", "Velocity", "Done"], rows)?);
        }
        Ok(())
    }

    fn add_tier1(&mut self, tier1: &Tier1Metrics) -> Result<()> {
        let goal = &tier1.sprint_goal;
        self.header2("Sprint goal");
        self.paragraph(format!(
            "**{}** at {:.1}% (threshold {:.0}%)",
            if goal.achieved { "Achieved" } else { "Not achieved" },
            goal.completion_percentage,
            goal.achievement_threshold
        ));

        if !tier1.scope_changes.is_empty() {
            self.header2("Scope changes");
            let rows = tier1
                .scope_changes
                .iter()
                .map(|change| {
                    vec![
                        change.issue_key.clone(),
                        format!("{:?}", change.kind),
                        change.at.format("%d.%m.%Y").to_string(),
                        format!("{:+}", change.story_points_delta),
                    ]
                })
                .collect::<Vec<_>>();
            self.paragraph(table(&["Issue", "Change", "Date", "Points"], rows)?);
        }

        let spillover = &tier1.spillover;
        self.header2(format!("Spillover ({:.1}%)", spillover.spillover_percentage));
        let rows = spillover
            .incomplete_issues
            .iter()
            .map(|issue| {
                vec![
                    issue.issue_key.clone(),
                    issue.status.clone(),
                    format!("{}", issue.story_points),
                    issue.reason.to_string(),
                ]
            })
            .collect::<Vec<_>>();
        if !rows.is_empty() {
            self.paragraph(table(&["Issue", "Status", "Points", "Reason"], rows)?);
        }
        Ok(())
    }

    fn add_tier2(&mut self, tier2: &Tier2Metrics) -> Result<()> {
        if !tier2.blockers.is_empty() {
            self.header2("Blockers");
            let rows = tier2
                .blockers
                .iter()
                .map(|blocker| {
                    vec![
                        blocker.issue_key.clone(),
                        format!("{}", blocker.days_blocked),
                        blocker.impact.to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            self.paragraph(table(&["Issue", "Days", "Impact"], rows)?);
        }

        let bugs = &tier2.bug_metrics;
        self.header2("Quality");
        self.paragraph(format!(
            "Bugs created {}, resolved {} (net {:+}), critical outstanding {}",
            bugs.bugs_created,
            bugs.bugs_resolved,
            bugs.net_bug_change,
            bugs.critical_bugs_outstanding
        ));

        let cycle = &tier2.cycle_time;
        self.paragraph(format!(
            "Cycle time: average {:.1}d, median {:.1}d, p90 {:.1}d over {} issues",
            cycle.average_days, cycle.median_days, cycle.p90_days, cycle.sample_size
        ));
        Ok(())
    }

    fn add_tier3(&mut self, tier3: &Tier3Metrics) -> Result<()> {
        if !tier3.epic_progress.is_empty() {
            self.header2("Epics");
            let rows = tier3
                .epic_progress
                .iter()
                .map(|epic| {
                    vec![
                        epic.epic_name.clone().unwrap_or_else(|| epic.epic_key.clone()),
                        format!("{} / {}", epic.completed_issues, epic.total_issues),
                        format!("{:.1}%", epic.completion_percentage),
                    ]
                })
                .collect::<Vec<_>>();
            self.paragraph(table(&["Epic", "Issues", "Done"], rows)?);
        }

        if !tier3.risks.is_empty() {
            self.header2("Risks");
            let rows = tier3
                .risks
                .iter()
                .map(|risk| {
                    vec![
                        risk.issue_key.clone(),
                        risk.probability.to_string(),
                        risk.impact.to_string(),
                        format!("{:?}", risk.status),
                    ]
                })
                .collect::<Vec<_>>();
            self.paragraph(table(&["Issue", "Probability", "Impact", "Status"], rows)?);
        }
        Ok(())
    }

    fn add_forward_looking(&mut self, forward: &ForwardLooking) {
        let forecast = &forward.next_sprint_forecast;
        self.header2("Next sprint");
        self.paragraph(format!(
            "Forecast **{:.1}** points ({} confidence), {:.1} available after {:.1} points of carryover",
            forecast.forecasted_velocity,
            forecast.confidence_level,
            forecast.available_capacity,
            forecast.carryover_story_points
        ));
        self.paragraph(bullets(&forecast.recommendations));
    }

    fn add_source_control(&mut self, metrics: &EnhancedSourceControlMetrics) -> Result<()> {
        self.header2("Source control");
        let rows = vec![
            vec![
                "Commits".to_string(),
                format!("{}", metrics.commit_activity.total_commits),
            ],
            vec![
                "Lines".to_string(),
                format!(
                    "+{} / -{}",
                    metrics.code_changes.lines_added, metrics.code_changes.lines_deleted
                ),
            ],
            vec![
                "Pull requests".to_string(),
                format!(
                    "{} ({} merged)",
                    metrics.pull_requests.total, metrics.pull_requests.merged
                ),
            ],
            vec![
                "Reviews".to_string(),
                format!("{}", metrics.reviews.total_reviews),
            ],
            vec![
                "Traceability".to_string(),
                format!("{:.1}%", metrics.traceability_coverage),
            ],
        ];
        self.paragraph(table(&["", "Value"], rows)?);
        Ok(())
    }
}
