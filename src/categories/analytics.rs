//! Cross-cutting health and trend charts. Fetch failures in this category are
//! skipped rather than fatal.

use super::{hot_times_plot, per_repo, stacked_by_year};
use crate::chart::{Chart, Panel, Plot};
use crate::github::GitHubApi;
use crate::metrics::{days_between, earliest_year, ratio, series, HotTimes, LanguageTimeline, Tally};
use crate::pipeline::Context;
use crate::types::{PullState, Repository};

const TOP_LABELS: usize = 10;

pub async fn generate<A: GitHubApi + ?Sized>(
    ctx: &mut Context<'_, A>,
    repos: &[Repository],
) -> anyhow::Result<()> {
    let now = ctx.now();

    let mut added = 0;
    let mut deleted = 0;
    let mut inspected = 0;
    let mut timeline = LanguageTimeline::default();
    let mut hot = HotTimes::default();

    for repo in repos {
        let commits = ctx.commits(repo).await?;
        for commit in &commits {
            let detail = ctx.commit_detail(repo, &commit.sha).await?;
            added += detail.stats.additions;
            deleted += detail.stats.deletions;
            inspected += 1;
            if let Some(at) = commit.authored_at {
                hot.record(at);
            }
        }

        if let Some(year) = earliest_year(commits.iter().filter_map(|c| c.authored_at)) {
            for (language, bytes) in ctx.languages(repo).await? {
                timeline.add(year, &language, bytes);
            }
        }
    }

    let churn = if inspected == 0 {
        Vec::new()
    } else {
        vec![
            ("Lines Added".to_string(), added as f64),
            ("Lines Deleted".to_string(), deleted as f64),
        ]
    };
    ctx.emit(Chart::new("churn_rate", "Churn Rate", Plot::Bar(churn)).y_label("Lines"))?;

    let mut merge_ratios = Vec::with_capacity(repos.len());
    for repo in repos {
        let pulls = ctx.pulls(repo, PullState::All).await?;
        let merged = pulls.iter().filter(|pull| pull.is_merged()).count();
        merge_ratios.push((repo.name.clone(), ratio(merged as u64, pulls.len() as u64)));
    }
    let panels = vec![
        Panel {
            title: "Open Issues".to_string(),
            bars: per_repo(repos, |repo| repo.open_issues_count as f64),
        },
        Panel {
            title: "PR Merge Ratio".to_string(),
            bars: merge_ratios,
        },
        Panel {
            title: "Days Since Last Commit".to_string(),
            bars: per_repo(repos, |repo| days_between(repo.last_activity(), now) as f64),
        },
    ];
    ctx.emit(Chart::new(
        "repo_health_index",
        "Repository Health Index",
        Plot::Panels(panels),
    ))?;

    ctx.emit(
        Chart::new(
            "tech_stack_evolution",
            "Tech Stack Evolution Over Years",
            stacked_by_year(&timeline),
        )
        .x_label("Year")
        .y_label("Bytes of code"),
    )?;

    ctx.emit(
        Chart::new("commit_hot_times", "Commit Hot Times", hot_times_plot(hot.rows()))
            .x_label("Hour of day (UTC)")
            .y_label("Weekday"),
    )?;

    let mut labels = Tally::new();
    for repo in repos {
        for item in ctx.issues(repo).await? {
            for label in item.labels {
                labels.incr(label.name);
            }
        }
    }
    ctx.emit(
        Chart::new(
            "pr_issue_topics",
            "Top PR / Issue Labels",
            Plot::Bar(series(labels.most_common(TOP_LABELS))),
        )
        .empty_message("No labels found"),
    )?;

    let mut contributors = Vec::with_capacity(repos.len());
    for repo in repos {
        let count = ctx.contributors(repo).await?.len();
        contributors.push((repo.name.clone(), count as f64));
    }
    ctx.emit(
        Chart::new(
            "avg_contributors",
            "Contributors per Repository",
            Plot::Bar(contributors),
        )
        .y_label("Contributors"),
    )?;

    ctx.emit(
        Chart::new(
            "open_source_impact",
            "Open Source Impact",
            Plot::Bar(per_repo(repos, |repo| repo.impact() as f64)),
        )
        .y_label("Stars + forks + watchers"),
    )?;

    Ok(())
}
