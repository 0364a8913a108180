use crate::chart::{Chart, Plot};
use crate::github::GitHubApi;
use crate::metrics::{mean, sentiment_counts, series, Tally};
use crate::pipeline::Context;
use crate::types::Repository;

/// Repositories whose commits are expanded into per-commit detail.
const DETAIL_REPOS: usize = 3;
const TOP_FILES: usize = 10;

pub async fn generate<A: GitHubApi + ?Sized>(
    ctx: &mut Context<'_, A>,
    repos: &[Repository],
) -> anyhow::Result<()> {
    let mut counts = Vec::with_capacity(repos.len());
    let mut message_lengths = Vec::with_capacity(repos.len());
    let mut topics = Tally::new();
    let mut messages = Vec::new();

    for repo in repos {
        let commits = ctx.commits(repo).await?;
        let lengths: Vec<f64> = commits
            .iter()
            .map(|commit| commit.message.chars().count() as f64)
            .collect();
        counts.push((repo.name.clone(), commits.len() as f64));
        message_lengths.push((repo.name.clone(), mean(&lengths)));
        messages.extend(commits.iter().map(|commit| commit.message.clone()));

        for topic in ctx.topics(repo).await? {
            topics.add(topic, commits.len() as u64);
        }
    }

    ctx.emit(
        Chart::new(
            "commits_per_repo",
            "Commits per Repository",
            Plot::HorizontalBar(counts),
        )
        .x_label("Commits"),
    )?;
    ctx.emit(
        Chart::new(
            "avg_commit_length",
            "Average Commit Message Length",
            Plot::Bar(message_lengths),
        )
        .y_label("Characters"),
    )?;
    ctx.emit(
        Chart::new(
            "commit_sentiment",
            "Commit Message Sentiment",
            Plot::Bar(sentiment_counts(messages.iter().map(String::as_str))),
        )
        .y_label("Commits")
        .empty_message("No commits found"),
    )?;

    ctx.emit(
        Chart::new(
            "commits_per_topic",
            "Commits per Topic",
            Plot::Bar(topics.into_series()),
        )
        .empty_message("No topics found"),
    )?;

    let mut branches = Tally::new();
    for repo in repos {
        for branch in ctx.branches(repo).await? {
            let commits = ctx.branch_commits(repo, &branch).await?;
            branches.add(branch.name, commits.len() as u64);
        }
    }
    ctx.emit(
        Chart::new(
            "commits_by_branch",
            "Commits by Branch",
            Plot::Bar(branches.into_series()),
        )
        .empty_message("No branches found"),
    )?;

    let mut files = Tally::new();
    for repo in repos.iter().take(DETAIL_REPOS) {
        for commit in ctx.commits(repo).await? {
            let detail = ctx.commit_detail(repo, &commit.sha).await?;
            for file in detail.files {
                files.incr(file.filename);
            }
        }
    }
    ctx.emit(
        Chart::new(
            "top_files",
            "Most Frequently Edited Files",
            Plot::HorizontalBar(series(files.most_common(TOP_FILES))),
        )
        .x_label("Edits")
        .empty_message("No files found"),
    )?;

    Ok(())
}
