use crate::chart::{Chart, Plot};
use crate::github::GitHubApi;
use crate::metrics::{minutes_between, Tally};
use crate::pipeline::Context;
use crate::types::Repository;

const DEPLOYMENT_BINS: usize = 15;

pub async fn generate<A: GitHubApi + ?Sized>(
    ctx: &mut Context<'_, A>,
    repos: &[Repository],
) -> anyhow::Result<()> {
    let mut runs_per_repo = Tally::new();
    let mut triggers = Tally::new();
    let mut failed = 0;
    let mut deployment_minutes = Vec::new();

    for repo in repos {
        for run in ctx.workflow_runs(repo).await? {
            runs_per_repo.incr(repo.name.clone());
            if let Some(event) = &run.event {
                triggers.incr(event.clone());
            }
            if run.failed() {
                failed += 1;
            }
            if let (Some(start), Some(end)) = (run.run_started_at, run.updated_at) {
                deployment_minutes.push(minutes_between(start, end));
            }
        }
    }
    let auto_merge = repos
        .iter()
        .filter(|repo| repo.allow_auto_merge.unwrap_or(false))
        .count();

    ctx.emit(
        Chart::new(
            "workflow_runs",
            "Workflow Runs per Repo",
            Plot::Bar(runs_per_repo.into_series()),
        )
        .y_label("Runs")
        .empty_message("No workflow runs found"),
    )?;
    ctx.emit(
        Chart::new(
            "workflow_triggers",
            "Workflow Triggers",
            Plot::Bar(triggers.into_series()),
        )
        .empty_message("No workflow runs found"),
    )?;

    let auto_merge_bars = if repos.is_empty() {
        Vec::new()
    } else {
        vec![
            ("Enabled".to_string(), auto_merge as f64),
            ("Disabled".to_string(), (repos.len() - auto_merge) as f64),
        ]
    };
    ctx.emit(Chart::new(
        "auto_merge",
        "Auto-Merge Usage",
        Plot::Bar(auto_merge_bars),
    ))?;

    ctx.emit(
        Chart::new(
            "deployment_time",
            "Deployment Time",
            Plot::Histogram {
                values: deployment_minutes,
                bins: DEPLOYMENT_BINS,
            },
        )
        .x_label("Minutes")
        .empty_message("No deployment data"),
    )?;

    ctx.emit(Chart::new(
        "failed_jobs",
        "Failed CI Jobs",
        Plot::Bar(vec![("Failed Jobs".to_string(), failed as f64)]),
    ))?;

    Ok(())
}
