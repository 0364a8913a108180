pub mod categories;
pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod metrics;
pub mod pipeline;
pub mod render;
pub mod types;

pub use config::{Account, AppConfig, Settings};
pub use error::{ConfigError, FetchError};
pub use github::{GitHubApi, GitHubClient};
pub use pipeline::{run, Category, CategoryReport, FetchPolicy};
