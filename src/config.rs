//! Application configuration and environment variable parsing.
//!
//! `AppConfig` mirrors the raw environment (optionally seeded from a .env file).
//! It is resolved once into `Settings`, which every pipeline stage receives by
//! reference. Nothing downstream reads the environment directly.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_PAGE_SIZE: u8 = 30;

/// The GitHub account whose activity is summarised.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Account {
    name: String,
}

impl Account {
    /// Derives the account from an `"<owner>/<anything>"` slug.
    ///
    /// Only the segment before the first `/` matters. A slug without any `/`
    /// names the account directly.
    pub fn from_slug(slug: &str) -> Result<Self, ConfigError> {
        let owner = slug.split_once('/').map_or(slug, |(owner, _)| owner).trim();
        if owner.is_empty() {
            return Err(ConfigError::InvalidSlug(slug.to_string()));
        }
        Ok(Self {
            name: owner.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// GitHub logins are case-insensitive.
    pub fn is(&self, login: &str) -> bool {
        self.name.eq_ignore_ascii_case(login)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Bearer token, used verbatim. Redacted in `Debug` output.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// `"<owner>/<repo>"` slug, as provided by GitHub Actions.
    pub github_repository: Option<String>,

    /// Personal access token used for every API call.
    pub gh_token: Option<String>,

    /// Proceed without a token (low rate limit) instead of failing.
    #[serde(default)]
    pub metrics_allow_anonymous: bool,

    /// Root directory that receives one subdirectory per category.
    #[serde(default = "default_output_dir")]
    pub metrics_output_dir: PathBuf,

    /// Page size for every list call other than the repository listing.
    /// Out-of-range values are clamped on resolve.
    #[serde(default = "default_page_size")]
    pub metrics_page_size: u32,

    /// Connect and read timeout for API calls. Client defaults apply when unset.
    pub metrics_request_timeout_seconds: Option<u64>,

    /// Base URI override, e.g. for GitHub Enterprise.
    pub github_api_url: Option<String>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("metrics")
}

fn default_page_size() -> u32 {
    u32::from(DEFAULT_PAGE_SIZE)
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::from_env()?)
    }
}

/// Resolved, validated settings for one run.
#[derive(Clone, Debug)]
pub struct Settings {
    pub account: Account,
    pub credential: Option<Credential>,
    pub output_dir: PathBuf,
    pub page_size: u8,
    pub request_timeout: Option<StdDuration>,
    pub api_url: Option<String>,
}

impl Settings {
    /// Settings with defaults for everything but the account and output root.
    pub fn new(account: Account, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            account,
            credential: None,
            output_dir: output_dir.into(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: None,
            api_url: None,
        }
    }

    pub fn resolve(config: AppConfig) -> Result<Self, ConfigError> {
        let slug = config
            .github_repository
            .filter(|slug| !slug.trim().is_empty())
            .ok_or(ConfigError::Missing("GITHUB_REPOSITORY"))?;
        let account = Account::from_slug(&slug)?;

        let credential = match config.gh_token.filter(|token| !token.is_empty()) {
            Some(token) => Some(Credential::new(token)),
            None if config.metrics_allow_anonymous => {
                tracing::warn!("GH_TOKEN not set, using unauthenticated requests");
                None
            }
            None => return Err(ConfigError::Missing("GH_TOKEN")),
        };

        Ok(Self {
            account,
            credential,
            output_dir: config.metrics_output_dir,
            page_size: u8::try_from(config.metrics_page_size.clamp(1, MAX_PAGE_SIZE))
                .unwrap_or(u8::MAX),
            request_timeout: config
                .metrics_request_timeout_seconds
                .map(StdDuration::from_secs),
            api_url: config.github_api_url,
        })
    }
}
