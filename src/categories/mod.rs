//! One module per metric category. Each exposes `generate`, which fetches what
//! its charts need through the `Context` and emits every chart in a fixed order.

pub mod analytics;
pub mod ci_cd;
pub mod commits;
pub mod fun;
pub mod languages;
pub mod prs_issues;
pub mod repos;
pub mod social;

use crate::chart::{Plot, Series};
use crate::metrics::LanguageTimeline;
use crate::types::Repository;

const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// One bar per repository, in listing order.
fn per_repo<F>(repos: &[Repository], value: F) -> Vec<(String, f64)>
where
    F: Fn(&Repository) -> f64,
{
    repos
        .iter()
        .map(|repo| (repo.name.clone(), value(repo)))
        .collect()
}

/// The `n` most-starred repositories, descending. Ties keep listing order.
fn top_by_stars(repos: &[Repository], n: usize) -> Vec<(String, f64)> {
    let mut sorted: Vec<&Repository> = repos.iter().collect();
    sorted.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
    sorted
        .into_iter()
        .take(n)
        .map(|repo| (repo.name.clone(), repo.stargazers_count as f64))
        .collect()
}

fn stacked_by_year(timeline: &LanguageTimeline) -> Plot {
    Plot::StackedBar {
        categories: timeline.years(),
        series: timeline
            .stacks()
            .into_iter()
            .map(|(name, values)| Series { name, values })
            .collect(),
    }
}

fn hot_times_plot(cells: Vec<Vec<u64>>) -> Plot {
    Plot::Heatmap {
        rows: WEEKDAY_NAMES.iter().map(|day| day.to_string()).collect(),
        columns: (0..24).map(|hour| hour.to_string()).collect(),
        cells,
    }
}
