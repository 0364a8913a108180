//! Error types shared by the configuration and fetch layers.

use thiserror::Error;

/// Raised while resolving settings, always before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("GITHUB_REPOSITORY must look like \"<owner>/<repo>\", got {0:?}")]
    InvalidSlug(String),

    #[error("failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),
}

/// A single GitHub API call that did not produce the expected record.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {route} failed: {source}")]
    Transport {
        route: String,
        #[source]
        source: octocrab::Error,
    },

    #[error("unexpected response shape from {route}: {source}")]
    Shape {
        route: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn route(&self) -> &str {
        match self {
            FetchError::Transport { route, .. } | FetchError::Shape { route, .. } => route,
        }
    }
}
