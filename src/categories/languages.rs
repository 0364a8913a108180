use super::stacked_by_year;
use crate::chart::{Chart, Plot};
use crate::github::GitHubApi;
use crate::metrics::{earliest_year, series, LanguageTimeline, Tally};
use crate::pipeline::Context;
use crate::types::Repository;

const UNKNOWN_LANGUAGE: &str = "Unknown";

pub async fn generate<A: GitHubApi + ?Sized>(
    ctx: &mut Context<'_, A>,
    repos: &[Repository],
) -> anyhow::Result<()> {
    let mut bytes = Tally::new();
    let mut commits_by_language = Tally::new();
    let mut first_seen = LanguageTimeline::default();
    let mut sizes = Tally::new();

    for repo in repos {
        let languages = ctx.languages(repo).await?;
        let commits = ctx.commits(repo).await?;

        for (language, amount) in &languages {
            bytes.add(language.clone(), *amount);
            sizes.add(language.clone(), repo.size);
        }

        if languages.is_empty() {
            commits_by_language.add(UNKNOWN_LANGUAGE.to_string(), commits.len() as u64);
        } else {
            for language in languages.keys() {
                commits_by_language.add(language.clone(), commits.len() as u64);
            }
        }

        if let Some(year) = earliest_year(commits.iter().filter_map(|c| c.authored_at)) {
            for language in languages.keys() {
                first_seen.add(year, language, 1);
            }
        }
    }

    ctx.emit(
        Chart::new(
            "languages_loc",
            "Bytes of Code per Language",
            Plot::Bar(series(bytes.most_common(bytes.len()))),
        )
        .y_label("Bytes")
        .empty_message("No languages found"),
    )?;
    ctx.emit(
        Chart::new(
            "languages_commits",
            "Commits per Language",
            Plot::Bar(series(commits_by_language.most_common(commits_by_language.len()))),
        )
        .y_label("Commits"),
    )?;
    ctx.emit(
        Chart::new(
            "new_languages",
            "Languages Adopted per Year",
            stacked_by_year(&first_seen),
        )
        .x_label("Year")
        .y_label("Repositories"),
    )?;
    ctx.emit(
        Chart::new(
            "language_repo",
            "Repository Size per Language",
            Plot::HorizontalBar(series(sizes.most_common(sizes.len()))),
        )
        .x_label("Size (KB)")
        .empty_message("No languages found"),
    )?;

    Ok(())
}
