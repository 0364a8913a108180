//! Charts drawn from the repository listing itself, plus one languages call per
//! repository.

use super::{per_repo, top_by_stars};
use crate::chart::{Chart, Plot, Series};
use crate::github::GitHubApi;
use crate::metrics::days_between;
use crate::pipeline::Context;
use crate::types::Repository;
use chrono::Datelike;
use std::collections::BTreeMap;

const PINNED: usize = 6;

pub async fn generate<A: GitHubApi + ?Sized>(
    ctx: &mut Context<'_, A>,
    repos: &[Repository],
) -> anyhow::Result<()> {
    let now = ctx.now();

    ctx.emit(
        Chart::new(
            "repo_activity",
            "Days Since Last Push",
            Plot::HorizontalBar(per_repo(repos, |repo| {
                days_between(repo.last_activity(), now) as f64
            })),
        )
        .x_label("Days"),
    )?;

    let mut created: BTreeMap<i32, u64> = BTreeMap::new();
    for repo in repos {
        *created.entry(repo.created_at.year()).or_insert(0) += 1;
    }
    ctx.emit(
        Chart::new(
            "repo_growth",
            "Repositories Created per Year",
            Plot::Line(
                created
                    .into_iter()
                    .map(|(year, count)| (year.to_string(), count as f64))
                    .collect(),
            ),
        )
        .x_label("Year")
        .y_label("Repositories"),
    )?;

    ctx.emit(
        Chart::new(
            "repo_sizes",
            "Repository Sizes",
            Plot::HorizontalBar(per_repo(repos, |repo| repo.size as f64)),
        )
        .x_label("Size (KB)"),
    )?;

    let mut complexity = Vec::with_capacity(repos.len());
    for repo in repos {
        let languages = ctx.languages(repo).await?;
        complexity.push((repo.name.clone(), languages.len() as f64));
    }
    ctx.emit(
        Chart::new(
            "language_complexity",
            "Languages per Repository",
            Plot::Bar(complexity),
        )
        .y_label("Languages"),
    )?;

    ctx.emit(
        Chart::new(
            "stars_forks",
            "Stars and Forks",
            Plot::StackedBar {
                categories: repos.iter().map(|repo| repo.name.clone()).collect(),
                series: vec![
                    Series {
                        name: "Stars".to_string(),
                        values: repos.iter().map(|r| r.stargazers_count as f64).collect(),
                    },
                    Series {
                        name: "Forks".to_string(),
                        values: repos.iter().map(|r| r.forks_count as f64).collect(),
                    },
                ],
            },
        ),
    )?;

    let forked = repos.iter().filter(|repo| repo.fork).count();
    let ownership = if repos.is_empty() {
        Vec::new()
    } else {
        vec![
            ("Forked".to_string(), forked as f64),
            ("Owned".to_string(), (repos.len() - forked) as f64),
        ]
    };
    ctx.emit(Chart::new(
        "contributed_to",
        "Contributed To Repos",
        Plot::Bar(ownership),
    ))?;

    ctx.emit(
        Chart::new(
            "pinned_repos",
            "Pinned Repos (Top Stars)",
            Plot::Bar(top_by_stars(repos, PINNED)),
        )
        .y_label("Stars"),
    )?;

    Ok(())
}
