//! The fetch → aggregate → render driver shared by every metric category.
//!
//! A run walks the requested categories in order. For each one it:
//! 1. Lists the account's repositories and keeps the first top-N.
//! 2. Hands them to the category, which fetches per-repository records through
//!    a `Context` and emits one chart per aggregate.
//! 3. Reports what was written.
//!
//! Any error ends the run. Charts written before the failure stay on disk.

use crate::categories;
use crate::chart::{Chart, ChartSink};
use crate::config::{Account, Settings};
use crate::error::FetchError;
use crate::github::GitHubApi;
use crate::types::{
    Branch, Commit, CommitDetail, Contributor, Issue, Languages, PullRequest, PullState,
    Repository, Review, WorkflowRun,
};
use anyhow::Context as _;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// How a category reacts to a failed per-repository fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Abort the run.
    Strict,
    /// Log the failure and continue as if the fetch returned nothing.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Category {
    Commits,
    PrsIssues,
    Analytics,
    Fun,
    Languages,
    Repos,
    Social,
    CiCd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySpec {
    pub name: &'static str,
    /// Subdirectory of the output root.
    pub output_dir: &'static str,
    /// Repositories kept from the listing.
    pub top_n: usize,
    pub policy: FetchPolicy,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Commits,
        Category::PrsIssues,
        Category::Analytics,
        Category::Fun,
        Category::Languages,
        Category::Repos,
        Category::Social,
        Category::CiCd,
    ];

    pub fn spec(self) -> CategorySpec {
        let (name, output_dir, top_n, policy) = match self {
            Category::Commits => ("commits", "commits", 5, FetchPolicy::Strict),
            Category::PrsIssues => ("prs-issues", "prs_issues", 5, FetchPolicy::Strict),
            Category::Analytics => ("analytics", "analytics", 10, FetchPolicy::Lenient),
            Category::Fun => ("fun", "fun", 10, FetchPolicy::Lenient),
            Category::Languages => ("languages", "languages", 10, FetchPolicy::Strict),
            Category::Repos => ("repos", "repos", 100, FetchPolicy::Strict),
            Category::Social => ("social", "social", 5, FetchPolicy::Strict),
            Category::CiCd => ("ci-cd", "ci_cd", 20, FetchPolicy::Strict),
        };
        CategorySpec {
            name,
            output_dir,
            top_n,
            policy,
        }
    }

    async fn generate<A: GitHubApi + ?Sized>(
        self,
        ctx: &mut Context<'_, A>,
        repos: &[Repository],
    ) -> anyhow::Result<()> {
        match self {
            Category::Commits => categories::commits::generate(ctx, repos).await,
            Category::PrsIssues => categories::prs_issues::generate(ctx, repos).await,
            Category::Analytics => categories::analytics::generate(ctx, repos).await,
            Category::Fun => categories::fun::generate(ctx, repos).await,
            Category::Languages => categories::languages::generate(ctx, repos).await,
            Category::Repos => categories::repos::generate(ctx, repos).await,
            Category::Social => categories::social::generate(ctx, repos).await,
            Category::CiCd => categories::ci_cd::generate(ctx, repos).await,
        }
    }
}

/// Outcome of one category.
#[derive(Debug, Clone)]
pub struct CategoryReport {
    pub category: Category,
    pub output_dir: PathBuf,
    pub repositories: usize,
    pub charts: Vec<PathBuf>,
    pub placeholders: usize,
}

/// Per-category state handed to the chart builders.
pub struct Context<'a, A: ?Sized> {
    api: &'a A,
    account: &'a Account,
    policy: FetchPolicy,
    now: DateTime<Utc>,
    sink: ChartSink,
    charts: Vec<PathBuf>,
    placeholders: usize,
}

impl<'a, A: GitHubApi + ?Sized> Context<'a, A> {
    pub fn new(
        api: &'a A,
        account: &'a Account,
        policy: FetchPolicy,
        now: DateTime<Utc>,
        sink: ChartSink,
    ) -> Self {
        Self {
            api,
            account,
            policy,
            now,
            sink,
            charts: Vec::new(),
            placeholders: 0,
        }
    }

    pub fn account(&self) -> &Account {
        self.account
    }

    pub fn api(&self) -> &A {
        self.api
    }

    /// Reference time for ages, recency windows and open-issue durations.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Applies the fetch policy to one per-repository result.
    pub fn settle<T: Default>(
        &self,
        repo: &str,
        result: Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        match (result, self.policy) {
            (Ok(value), _) => Ok(value),
            (Err(e), FetchPolicy::Lenient) => {
                tracing::warn!(repo = %repo, route = %e.route(), "Skipping failed fetch: {}", e);
                Ok(T::default())
            }
            (Err(e), FetchPolicy::Strict) => Err(e),
        }
    }

    pub async fn commits(&self, repo: &Repository) -> Result<Vec<Commit>, FetchError> {
        let result = self.api.list_commits(self.account, &repo.name, None).await;
        self.settle(&repo.name, result)
    }

    pub async fn branch_commits(
        &self,
        repo: &Repository,
        branch: &Branch,
    ) -> Result<Vec<Commit>, FetchError> {
        let result = self
            .api
            .list_commits(self.account, &repo.name, Some(&branch.name))
            .await;
        self.settle(&repo.name, result)
    }

    pub async fn commit_detail(
        &self,
        repo: &Repository,
        sha: &str,
    ) -> Result<CommitDetail, FetchError> {
        let result = self.api.get_commit(self.account, &repo.name, sha).await;
        self.settle(&repo.name, result)
    }

    pub async fn pulls(
        &self,
        repo: &Repository,
        state: PullState,
    ) -> Result<Vec<PullRequest>, FetchError> {
        let result = self.api.list_pulls(self.account, &repo.name, state).await;
        self.settle(&repo.name, result)
    }

    pub async fn issues(&self, repo: &Repository) -> Result<Vec<Issue>, FetchError> {
        let result = self.api.list_issues(self.account, &repo.name).await;
        self.settle(&repo.name, result)
    }

    pub async fn reviews(
        &self,
        repo: &Repository,
        pull: &PullRequest,
    ) -> Result<Vec<Review>, FetchError> {
        let result = self
            .api
            .list_reviews(self.account, &repo.name, pull.number)
            .await;
        self.settle(&repo.name, result)
    }

    pub async fn contributors(&self, repo: &Repository) -> Result<Vec<Contributor>, FetchError> {
        let result = self.api.list_contributors(self.account, &repo.name).await;
        self.settle(&repo.name, result)
    }

    pub async fn branches(&self, repo: &Repository) -> Result<Vec<Branch>, FetchError> {
        let result = self.api.list_branches(self.account, &repo.name).await;
        self.settle(&repo.name, result)
    }

    pub async fn languages(&self, repo: &Repository) -> Result<Languages, FetchError> {
        let result = self.api.list_languages(self.account, &repo.name).await;
        self.settle(&repo.name, result)
    }

    /// Topics inlined on the repository payload, else the topics endpoint.
    pub async fn topics(&self, repo: &Repository) -> Result<Vec<String>, FetchError> {
        if let Some(topics) = &repo.topics {
            return Ok(topics.clone());
        }
        let result = self.api.list_topics(self.account, &repo.name).await;
        self.settle(&repo.name, result)
    }

    pub async fn workflow_runs(&self, repo: &Repository) -> Result<Vec<WorkflowRun>, FetchError> {
        let result = self.api.list_workflow_runs(self.account, &repo.name).await;
        self.settle(&repo.name, result)
    }

    /// Renders and writes one chart, replacing any previous file.
    pub fn emit(&mut self, chart: Chart) -> anyhow::Result<()> {
        let written = self
            .sink
            .write(&chart)
            .with_context(|| format!("failed to write chart {}", chart.name))?;
        if written.placeholder {
            self.placeholders += 1;
            tracing::debug!(chart = %chart.name, "Wrote placeholder chart");
        } else {
            tracing::debug!(chart = %chart.name, "Wrote chart");
        }
        self.charts.push(written.path);
        Ok(())
    }
}

/// Runs every requested category in order, stopping at the first failure.
pub async fn run<A: GitHubApi + ?Sized>(
    api: &A,
    settings: &Settings,
    categories: &[Category],
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<CategoryReport>> {
    let mut reports = Vec::with_capacity(categories.len());
    for &category in categories {
        reports.push(run_category(api, settings, category, now).await?);
    }
    Ok(reports)
}

async fn run_category<A: GitHubApi + ?Sized>(
    api: &A,
    settings: &Settings,
    category: Category,
    now: DateTime<Utc>,
) -> anyhow::Result<CategoryReport> {
    let spec = category.spec();
    let account = &settings.account;
    tracing::info!(category = spec.name, top_n = spec.top_n, "Generating metrics");

    let per_page = spec.top_n.clamp(1, 100) as u8;
    let mut repos = api
        .list_repositories(account, per_page)
        .await
        .with_context(|| format!("failed to list repositories for {}", account))?;
    repos.truncate(spec.top_n);
    if repos.is_empty() {
        tracing::warn!(category = spec.name, account = %account, "No repositories listed");
    }

    let output_dir = settings.output_dir.join(spec.output_dir);
    let sink = ChartSink::create(&output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let mut ctx = Context::new(api, account, spec.policy, now, sink);
    category
        .generate(&mut ctx, &repos)
        .await
        .with_context(|| format!("failed to generate {} metrics", spec.name))?;

    tracing::info!(
        category = spec.name,
        charts = ctx.charts.len(),
        placeholders = ctx.placeholders,
        "Finished category"
    );

    Ok(CategoryReport {
        category,
        output_dir,
        repositories: repos.len(),
        charts: ctx.charts,
        placeholders: ctx.placeholders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_specs() {
        let dirs: Vec<&str> = Category::ALL
            .iter()
            .map(|c| c.spec().output_dir)
            .collect();
        assert_eq!(
            dirs,
            vec![
                "commits",
                "prs_issues",
                "analytics",
                "fun",
                "languages",
                "repos",
                "social",
                "ci_cd"
            ]
        );
        assert_eq!(Category::Commits.spec().top_n, 5);
        assert_eq!(Category::Repos.spec().top_n, 100);
        assert_eq!(Category::Fun.spec().policy, FetchPolicy::Lenient);
        assert_eq!(Category::Social.spec().policy, FetchPolicy::Strict);
    }

    #[test]
    fn test_category_cli_names() {
        use clap::ValueEnum;
        let names: Vec<String> = Category::value_variants()
            .iter()
            .filter_map(|c| c.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        assert!(names.contains(&"prs-issues".to_string()));
        assert!(names.contains(&"ci-cd".to_string()));
    }
}
