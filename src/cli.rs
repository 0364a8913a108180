use crate::pipeline::Category;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Metric categories to generate, in order. Defaults to all of them
    #[arg(value_enum)]
    pub categories: Vec<Category>,

    /// Root directory for the generated charts (overrides METRICS_OUTPUT_DIR)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Args {
    pub fn selected(&self) -> Vec<Category> {
        if self.categories.is_empty() {
            Category::ALL.to_vec()
        } else {
            self.categories.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_every_category() {
        let args = Args::parse_from(["profile-metrics"]);
        assert_eq!(args.selected(), Category::ALL.to_vec());
        assert!(args.output.is_none());
    }

    #[test]
    fn test_parses_categories_and_output() {
        let args = Args::parse_from(["profile-metrics", "ci-cd", "fun", "--output", "out"]);
        assert_eq!(args.selected(), vec![Category::CiCd, Category::Fun]);
        assert_eq!(args.output, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_rejects_unknown_category() {
        assert!(Args::try_parse_from(["profile-metrics", "sentiment"]).is_err());
    }
}
