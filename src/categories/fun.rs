use crate::chart::{Chart, Plot};
use crate::github::GitHubApi;
use crate::metrics::{streaks, word_frequencies, DailyActivity, ReviewTally, Tally};
use crate::pipeline::Context;
use crate::types::{PullState, Repository};
use chrono::Duration;

const HOT_WINDOW_DAYS: i64 = 7;
const HACKATHON_TOPIC: &str = "hackathon";
const CLOUD_WORDS: usize = 100;

pub async fn generate<A: GitHubApi + ?Sized>(
    ctx: &mut Context<'_, A>,
    repos: &[Repository],
) -> anyhow::Result<()> {
    let account = ctx.account().clone();
    let since = ctx.now() - Duration::days(HOT_WINDOW_DAYS);

    let mut days = Vec::new();
    let mut recent = Vec::with_capacity(repos.len());
    let mut messages = Vec::new();
    let mut activity = DailyActivity::default();

    for repo in repos {
        let commits = ctx.commits(repo).await?;
        let mut hot = 0;
        for commit in commits {
            if let Some(at) = commit.authored_at {
                days.push(at.date_naive());
                activity.commit(at);
                if at > since {
                    hot += 1;
                }
            }
            messages.push(commit.message);
        }
        recent.push((repo.name.clone(), hot as f64));
    }

    let streak = streaks(days);
    let streak_bars = if streak.longest == 0 {
        Vec::new()
    } else {
        vec![
            ("Longest Streak".to_string(), streak.longest as f64),
            ("Current Streak".to_string(), streak.current as f64),
        ]
    };
    ctx.emit(
        Chart::new(
            "contribution_streaks",
            "Contribution Streaks (days)",
            Plot::Bar(streak_bars),
        )
        .empty_message("No commits found"),
    )?;

    ctx.emit(
        Chart::new(
            "hot_repos",
            "Hot Repos (Commits in Last 7 Days)",
            Plot::Bar(recent),
        )
        .y_label("Commits"),
    )?;

    let words = word_frequencies(messages.iter().map(String::as_str));
    ctx.emit(
        Chart::new(
            "commit_wordcloud",
            "Commit Word Cloud",
            Plot::WordCloud(words.most_common(CLOUD_WORDS)),
        )
        .empty_message("No commit messages found"),
    )?;

    let mut diversity = Vec::with_capacity(repos.len());
    for repo in repos {
        let count = ctx.contributors(repo).await?.len();
        diversity.push((repo.name.clone(), count as f64));
    }
    ctx.emit(
        Chart::new(
            "contributor_diversity",
            "Contributor Diversity per Repo",
            Plot::Bar(diversity),
        )
        .y_label("Contributors"),
    )?;

    let mut hackathons = Tally::new();
    for repo in repos {
        let topics = ctx.topics(repo).await?;
        if topics.iter().any(|topic| topic == HACKATHON_TOPIC) {
            let commits = ctx.commits(repo).await?;
            hackathons.add(repo.name.clone(), commits.len() as u64);
        }
    }
    ctx.emit(
        Chart::new(
            "hackathon_contributions",
            "Hackathon / Event Contributions",
            Plot::Bar(hackathons.into_series()),
        )
        .empty_message("No hackathon repositories found"),
    )?;

    let mut reviews = ReviewTally::default();
    for repo in repos {
        for pull in ctx.pulls(repo, PullState::Closed).await? {
            let pull_reviews = ctx.reviews(repo, &pull).await?;
            reviews.merge(ReviewTally::by_reviewer(&pull_reviews, account.name()));
        }
    }
    ctx.emit(Chart::new(
        "code_review_karma",
        "Code Review Karma",
        Plot::Bar(vec![("Code Review Karma".to_string(), reviews.karma() as f64)]),
    ))?;

    for repo in repos {
        for pull in ctx.pulls(repo, PullState::All).await? {
            activity.pull_request(pull.created_at);
        }
        for issue in ctx.issues(repo).await? {
            activity.issue(&issue);
        }
    }
    ctx.emit(
        Chart::new(
            "activity_score_per_day",
            "Activity Score per Day",
            Plot::Line(activity.into_series()),
        )
        .x_label("Date")
        .y_label("Score"),
    )?;

    Ok(())
}
