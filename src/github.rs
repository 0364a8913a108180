//! Read-only access to the GitHub REST API.
//!
//! `GitHubApi` is the seam the pipeline is generic over. `GitHubClient` is the
//! octocrab-backed implementation; it memoizes every response for the lifetime
//! of the client, so sections that re-read the same listing hit the network once.

use crate::config::{Account, Settings};
use crate::error::FetchError;
use crate::types::{
    Branch, Commit, CommitDetail, Contributor, Issue, Languages, Organization, PullRequest,
    PullState, Repository, Review, Topics, UserProfile, WorkflowRun, WorkflowRuns,
};
use async_trait::async_trait;
use moka::future::Cache;
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use serde_json::Value;

const RESPONSE_CACHE_CAPACITY: u64 = 10_000;

#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// One page of the account's repositories in the API's default order.
    async fn list_repositories(
        &self,
        account: &Account,
        per_page: u8,
    ) -> Result<Vec<Repository>, FetchError>;

    /// Commits on the default branch, or on `branch` when given.
    async fn list_commits(
        &self,
        account: &Account,
        repo: &str,
        branch: Option<&str>,
    ) -> Result<Vec<Commit>, FetchError>;

    async fn get_commit(
        &self,
        account: &Account,
        repo: &str,
        sha: &str,
    ) -> Result<CommitDetail, FetchError>;

    async fn list_pulls(
        &self,
        account: &Account,
        repo: &str,
        state: PullState,
    ) -> Result<Vec<PullRequest>, FetchError>;

    /// Issues in any state. The listing includes pull requests.
    async fn list_issues(&self, account: &Account, repo: &str) -> Result<Vec<Issue>, FetchError>;

    async fn list_reviews(
        &self,
        account: &Account,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Review>, FetchError>;

    async fn list_contributors(
        &self,
        account: &Account,
        repo: &str,
    ) -> Result<Vec<Contributor>, FetchError>;

    async fn list_branches(&self, account: &Account, repo: &str)
        -> Result<Vec<Branch>, FetchError>;

    async fn list_languages(&self, account: &Account, repo: &str) -> Result<Languages, FetchError>;

    async fn list_topics(&self, account: &Account, repo: &str) -> Result<Vec<String>, FetchError>;

    async fn list_workflow_runs(
        &self,
        account: &Account,
        repo: &str,
    ) -> Result<Vec<WorkflowRun>, FetchError>;

    async fn get_user(&self, account: &Account) -> Result<UserProfile, FetchError>;

    async fn list_organizations(&self, account: &Account)
        -> Result<Vec<Organization>, FetchError>;

    /// Number of repositories the account has starred (first page).
    async fn count_starred(&self, account: &Account) -> Result<usize, FetchError>;
}

#[derive(Debug, Default, Serialize)]
struct Query<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    per_page: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl Query<'_> {
    fn is_empty(&self) -> bool {
        self.per_page.is_none() && self.state.is_none() && self.sha.is_none()
    }
}

pub struct GitHubClient {
    octocrab: Octocrab,
    responses: Cache<String, Value>,
    page_size: u8,
}

impl GitHubClient {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let mut builder = Octocrab::builder().add_retry_config(RetryConfig::None);
        if let Some(credential) = &settings.credential {
            builder = builder.personal_token(credential.expose().to_string());
        }
        if let Some(url) = &settings.api_url {
            builder = builder.base_uri(url.as_str())?;
        }
        if let Some(timeout) = settings.request_timeout {
            builder = builder
                .set_connect_timeout(Some(timeout))
                .set_read_timeout(Some(timeout));
        }

        let responses = Cache::builder()
            .max_capacity(RESPONSE_CACHE_CAPACITY)
            .build();

        Ok(Self {
            octocrab: builder.build()?,
            responses,
            page_size: settings.page_size,
        })
    }

    fn list_query<'a>(&self) -> Query<'a> {
        Query {
            per_page: Some(self.page_size),
            ..Query::default()
        }
    }

    /// GETs `route`, decoding the body into `T`.
    ///
    /// The raw JSON is cached by route and query; decoding happens on every call.
    async fn fetch<T: DeserializeOwned + Send>(
        &self,
        route: String,
        query: Query<'_>,
    ) -> Result<T, FetchError> {
        let key = format!("{} {:?}", route, query);
        let value = match self.responses.get(&key).await {
            Some(value) => {
                tracing::debug!(route = %route, "Serving cached response");
                value
            }
            None => {
                tracing::debug!(route = %route, "GET");
                let params = (!query.is_empty()).then_some(&query);
                let value: Value = self
                    .octocrab
                    .get(&route, params)
                    .await
                    .map_err(|source| FetchError::Transport {
                        route: route.clone(),
                        source,
                    })?;
                self.responses.insert(key, value.clone()).await;
                value
            }
        };

        serde_json::from_value(value).map_err(|source| FetchError::Shape { route, source })
    }
}

fn repo_route(account: &Account, repo: &str, tail: &str) -> String {
    format!("/repos/{}/{}/{}", account.name(), repo, tail)
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn list_repositories(
        &self,
        account: &Account,
        per_page: u8,
    ) -> Result<Vec<Repository>, FetchError> {
        let query = Query {
            per_page: Some(per_page),
            ..Query::default()
        };
        self.fetch(format!("/users/{}/repos", account.name()), query)
            .await
    }

    async fn list_commits(
        &self,
        account: &Account,
        repo: &str,
        branch: Option<&str>,
    ) -> Result<Vec<Commit>, FetchError> {
        let query = Query {
            sha: branch,
            ..self.list_query()
        };
        self.fetch(repo_route(account, repo, "commits"), query).await
    }

    async fn get_commit(
        &self,
        account: &Account,
        repo: &str,
        sha: &str,
    ) -> Result<CommitDetail, FetchError> {
        self.fetch(
            repo_route(account, repo, &format!("commits/{}", sha)),
            Query::default(),
        )
        .await
    }

    async fn list_pulls(
        &self,
        account: &Account,
        repo: &str,
        state: PullState,
    ) -> Result<Vec<PullRequest>, FetchError> {
        let query = Query {
            state: Some(state.as_str()),
            ..self.list_query()
        };
        self.fetch(repo_route(account, repo, "pulls"), query).await
    }

    async fn list_issues(&self, account: &Account, repo: &str) -> Result<Vec<Issue>, FetchError> {
        let query = Query {
            state: Some(PullState::All.as_str()),
            ..self.list_query()
        };
        self.fetch(repo_route(account, repo, "issues"), query).await
    }

    async fn list_reviews(
        &self,
        account: &Account,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Review>, FetchError> {
        self.fetch(
            repo_route(account, repo, &format!("pulls/{}/reviews", number)),
            self.list_query(),
        )
        .await
    }

    async fn list_contributors(
        &self,
        account: &Account,
        repo: &str,
    ) -> Result<Vec<Contributor>, FetchError> {
        self.fetch(repo_route(account, repo, "contributors"), self.list_query())
            .await
    }

    async fn list_branches(
        &self,
        account: &Account,
        repo: &str,
    ) -> Result<Vec<Branch>, FetchError> {
        self.fetch(repo_route(account, repo, "branches"), self.list_query())
            .await
    }

    async fn list_languages(&self, account: &Account, repo: &str) -> Result<Languages, FetchError> {
        self.fetch(repo_route(account, repo, "languages"), Query::default())
            .await
    }

    async fn list_topics(&self, account: &Account, repo: &str) -> Result<Vec<String>, FetchError> {
        let topics: Topics = self
            .fetch(repo_route(account, repo, "topics"), Query::default())
            .await?;
        Ok(topics.names)
    }

    async fn list_workflow_runs(
        &self,
        account: &Account,
        repo: &str,
    ) -> Result<Vec<WorkflowRun>, FetchError> {
        let runs: WorkflowRuns = self
            .fetch(repo_route(account, repo, "actions/runs"), self.list_query())
            .await?;
        Ok(runs.workflow_runs)
    }

    async fn get_user(&self, account: &Account) -> Result<UserProfile, FetchError> {
        self.fetch(format!("/users/{}", account.name()), Query::default())
            .await
    }

    async fn list_organizations(
        &self,
        account: &Account,
    ) -> Result<Vec<Organization>, FetchError> {
        self.fetch(format!("/users/{}/orgs", account.name()), self.list_query())
            .await
    }

    async fn count_starred(&self, account: &Account) -> Result<usize, FetchError> {
        let starred: Vec<IgnoredAny> = self
            .fetch(format!("/users/{}/starred", account.name()), self.list_query())
            .await?;
        Ok(starred.len())
    }
}
