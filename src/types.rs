//! Records returned by the GitHub REST API, trimmed to the fields the charts read.
//!
//! Every timestamp is deserialized as `DateTime<Utc>`; GitHub always sends RFC 3339
//! with a `Z` suffix.

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Bytes of code per language, as reported by the languages endpoint.
pub type Languages = BTreeMap<String, u64>;

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    /// Declared size in kilobytes.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub allow_auto_merge: Option<bool>,
    /// Present only when the listing payload inlines topics.
    #[serde(default)]
    pub topics: Option<Vec<String>>,
}

impl Repository {
    /// Stars, forks and watchers combined.
    pub fn impact(&self) -> u64 {
        self.stargazers_count + self.forks_count + self.watchers_count
    }

    /// Last push, falling back to creation for never-pushed repositories.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.pushed_at.unwrap_or(self.created_at)
    }
}

/// One entry of a commit listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawCommit")]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub authored_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RawCommit {
    sha: String,
    commit: RawCommitBody,
}

#[derive(Deserialize)]
struct RawCommitBody {
    message: String,
    #[serde(default)]
    author: Option<RawSignature>,
}

#[derive(Deserialize)]
struct RawSignature {
    date: DateTime<Utc>,
}

impl From<RawCommit> for Commit {
    fn from(raw: RawCommit) -> Self {
        Self {
            sha: raw.sha,
            message: raw.commit.message,
            authored_at: raw.commit.author.map(|author| author.date),
        }
    }
}

/// Per-commit detail; line stats and touched files are absent from listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub stats: CommitStats,
    #[serde(default)]
    pub files: Vec<ChangedFile>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CommitStats {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

impl CommitStats {
    pub fn lines_changed(&self) -> u64 {
        self.additions + self.deletions
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub state: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub review_comments: u64,
    #[serde(default)]
    pub mergeable_state: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    pub fn merge_state(&self) -> &str {
        self.mergeable_state.as_deref().unwrap_or("unknown")
    }

    pub fn author(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.login.as_str())
    }
}

/// An item of the issues listing, which also contains pull requests.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub state: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub body: Option<String>,
    /// Whether the `pull_request` key was present, whatever its value.
    #[serde(default, rename = "pull_request", deserialize_with = "key_present")]
    pub has_pull_request_key: bool,
}

fn key_present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    IgnoredAny::deserialize(deserializer).map(|_| true)
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.has_pull_request_key
    }

    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub user: Option<User>,
    pub state: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Review {
    pub fn reviewer(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.login.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contributor {
    /// Anonymous contributors have no login.
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Topics {
    #[serde(default)]
    pub names: Vec<String>,
}

/// The slice of the user profile the social charts need. Both counts are required.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub login: String,
    pub followers: u64,
    pub following: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Organization {
    pub login: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowRuns {
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub run_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    pub fn failed(&self) -> bool {
        self.conclusion.as_deref() == Some("failure")
    }
}

/// `state` filter of the pulls listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullState {
    Open,
    Closed,
    All,
}

impl PullState {
    pub fn as_str(self) -> &'static str {
        match self {
            PullState::Open => "open",
            PullState::Closed => "closed",
            PullState::All => "all",
        }
    }
}
