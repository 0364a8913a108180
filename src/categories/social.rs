use super::top_by_stars;
use crate::chart::{Chart, Plot};
use crate::github::GitHubApi;
use crate::metrics::{series, Tally};
use crate::pipeline::Context;
use crate::types::{PullState, Repository};

const TOP_COLLABORATORS: usize = 10;
const TOP_STARRED: usize = 10;

pub async fn generate<A: GitHubApi + ?Sized>(
    ctx: &mut Context<'_, A>,
    repos: &[Repository],
) -> anyhow::Result<()> {
    let account = ctx.account().clone();

    let profile = ctx.api().get_user(&account).await?;
    ctx.emit(
        Chart::new(
            "followers_growth",
            "Follower / Following Growth",
            Plot::Bar(vec![
                ("Followers".to_string(), profile.followers as f64),
                ("Following".to_string(), profile.following as f64),
            ]),
        )
        .y_label("Count"),
    )?;

    let mut collaborators = Tally::new();
    for repo in repos {
        for pull in ctx.pulls(repo, PullState::Closed).await? {
            match pull.author() {
                Some(login) if !account.is(login) => collaborators.incr(login.to_string()),
                _ => {}
            }
        }
    }
    ctx.emit(
        Chart::new(
            "top_collaborators",
            "Top Collaborators",
            Plot::HorizontalBar(series(collaborators.most_common(TOP_COLLABORATORS))),
        )
        .x_label("Closed PRs")
        .empty_message("No collaborators"),
    )?;

    let mut mentions = Tally::new();
    for repo in repos {
        for item in ctx.issues(repo).await? {
            if item.body.as_deref().is_some_and(|body| body.contains('@')) {
                mentions.incr(repo.name.clone());
            }
        }
    }
    ctx.emit(
        Chart::new(
            "mentions",
            "Mentions in Issues / PRs",
            Plot::Bar(mentions.into_series()),
        )
        .empty_message("No mentions found"),
    )?;

    let orgs = ctx.api().list_organizations(&account).await?;
    ctx.emit(
        Chart::new(
            "orgs",
            "Organizations Contributed To",
            Plot::Bar(orgs.into_iter().map(|org| (org.login, 1.0)).collect()),
        )
        .empty_message("No orgs found"),
    )?;

    let given = ctx.api().count_starred(&account).await?;
    let received: u64 = repos.iter().map(|repo| repo.stargazers_count).sum();
    ctx.emit(
        Chart::new(
            "stars_karma",
            "Stars Given vs Stars Received",
            Plot::Bar(vec![
                ("Stars Given".to_string(), given as f64),
                ("Stars Received".to_string(), received as f64),
            ]),
        )
        .y_label("Count"),
    )?;

    ctx.emit(
        Chart::new(
            "starred_repos",
            "Most Starred Repos",
            Plot::HorizontalBar(top_by_stars(repos, TOP_STARRED)),
        )
        .x_label("Stars")
        .empty_message("No starred repos"),
    )?;

    Ok(())
}
