use crate::chart::{Chart, Plot, Series};
use crate::github::GitHubApi;
use crate::metrics::{days_between, hours_between, partition_issues, series, ReviewTally, Tally};
use crate::pipeline::Context;
use crate::types::{PullState, Repository};

const TOP_LABELS: usize = 10;

pub async fn generate<A: GitHubApi + ?Sized>(
    ctx: &mut Context<'_, A>,
    repos: &[Repository],
) -> anyhow::Result<()> {
    let account = ctx.account().clone();
    let now = ctx.now();

    let mut merge_hours = Vec::new();
    let mut sizes = Vec::new();
    let mut comments = Vec::new();
    let mut reviews = ReviewTally::default();
    let mut latencies = Vec::new();
    let mut merge_states = Tally::new();
    let mut issue_ages = Vec::new();
    let mut open = Vec::with_capacity(repos.len());
    let mut closed = Vec::with_capacity(repos.len());
    let mut labels = Tally::new();

    for repo in repos {
        for pull in ctx.pulls(repo, PullState::Closed).await? {
            let Some(merged_at) = pull.merged_at else {
                continue;
            };
            merge_hours.push(hours_between(pull.created_at, merged_at));
            if let Some(sha) = &pull.merge_commit_sha {
                let detail = ctx.commit_detail(repo, sha).await?;
                sizes.push(detail.stats.lines_changed() as f64);
            }
        }

        for pull in ctx.pulls(repo, PullState::All).await? {
            comments.push((pull.comments + pull.review_comments) as f64);
            merge_states.incr(pull.merge_state().to_string());
            for label in &pull.labels {
                labels.incr(label.name.clone());
            }

            let pull_reviews = ctx.reviews(repo, &pull).await?;
            reviews.merge(ReviewTally::by_reviewer(&pull_reviews, account.name()));

            if let Some(first) = pull_reviews.iter().filter_map(|r| r.submitted_at).min() {
                latencies.push(hours_between(pull.created_at, first));
            }
        }

        let listing = ctx.issues(repo).await?;
        let (issues, _) = partition_issues(&listing);
        let mut open_count = 0;
        for issue in &issues {
            let end = issue.closed_at.unwrap_or(now);
            issue_ages.push(days_between(issue.created_at, end) as f64);
            if issue.is_open() {
                open_count += 1;
            }
            for label in &issue.labels {
                labels.incr(label.name.clone());
            }
        }
        open.push(open_count as f64);
        closed.push((issues.len() - open_count) as f64);
    }

    ctx.emit(
        Chart::new("pr_merge_time", "PR Merge Time", Plot::histogram(merge_hours))
            .x_label("Hours to merge")
            .y_label("PRs")
            .empty_message("No merged PRs found"),
    )?;
    ctx.emit(
        Chart::new("pr_size", "PR Size (lines changed)", Plot::histogram(sizes))
            .x_label("Lines changed")
            .y_label("PRs")
            .empty_message("No merged PRs found"),
    )?;
    ctx.emit(
        Chart::new("pr_comments", "PR Comments", Plot::histogram(comments))
            .x_label("Comments per PR")
            .y_label("PRs")
            .empty_message("No PRs found"),
    )?;
    ctx.emit(
        Chart::new(
            "pr_approval_rate",
            "PR Approval Rate",
            Plot::Bar(vec![("Approval Rate".to_string(), reviews.approval_rate())]),
        )
        .y_label("% Approved")
        .y_max(100.0),
    )?;
    ctx.emit(
        Chart::new("issue_age", "Issue Age", Plot::histogram(issue_ages))
            .x_label("Days open")
            .y_label("Issues")
            .empty_message("No issues found"),
    )?;
    ctx.emit(
        Chart::new(
            "closed_vs_open",
            "Closed vs Open Issues",
            Plot::StackedBar {
                categories: repos.iter().map(|repo| repo.name.clone()).collect(),
                series: vec![
                    Series {
                        name: "Open".to_string(),
                        values: open,
                    },
                    Series {
                        name: "Closed".to_string(),
                        values: closed,
                    },
                ],
            },
        )
        .y_label("Issues"),
    )?;
    ctx.emit(
        Chart::new(
            "top_labels",
            "Top Labels",
            Plot::Bar(series(labels.most_common(TOP_LABELS))),
        )
        .empty_message("No labels found"),
    )?;
    ctx.emit(
        Chart::new(
            "pr_review_latency",
            "PR Review Latency",
            Plot::histogram(latencies),
        )
        .x_label("Hours to first review")
        .y_label("PRs")
        .empty_message("No reviews found"),
    )?;
    ctx.emit(
        Chart::new(
            "pr_merge_method",
            "PR Merge State",
            Plot::Bar(merge_states.into_series()),
        )
        .empty_message("No PRs found"),
    )?;

    Ok(())
}
