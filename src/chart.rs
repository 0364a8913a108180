//! Chart descriptions and the sink that writes them to disk.
//!
//! A chart is pure data; `render` turns it into an SVG document. Empty plots are
//! rendered as a placeholder, so no caller has to special-case missing data.

use crate::render;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_EMPTY_MESSAGE: &str = "No data available";
pub const DEFAULT_BINS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub bars: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Plot {
    Bar(Vec<(String, f64)>),
    HorizontalBar(Vec<(String, f64)>),
    Histogram {
        values: Vec<f64>,
        bins: usize,
    },
    StackedBar {
        categories: Vec<String>,
        series: Vec<Series>,
    },
    Heatmap {
        rows: Vec<String>,
        columns: Vec<String>,
        cells: Vec<Vec<u64>>,
    },
    Line(Vec<(String, f64)>),
    WordCloud(Vec<(String, u64)>),
    Panels(Vec<Panel>),
    Text(Vec<String>),
}

impl Plot {
    pub fn histogram(values: Vec<f64>) -> Self {
        Plot::Histogram {
            values,
            bins: DEFAULT_BINS,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Plot::Bar(bars) | Plot::HorizontalBar(bars) | Plot::Line(bars) => bars.is_empty(),
            Plot::Histogram { values, .. } => !values.iter().any(|v| v.is_finite()),
            Plot::StackedBar { categories, series } => {
                categories.is_empty() || series.is_empty()
            }
            Plot::Heatmap { cells, .. } => cells.iter().flatten().all(|&count| count == 0),
            Plot::WordCloud(words) => words.is_empty(),
            Plot::Panels(panels) => panels.iter().all(|panel| panel.bars.is_empty()),
            Plot::Text(lines) => lines.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// File stem inside the category directory.
    pub name: String,
    pub title: String,
    pub plot: Plot,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    /// Fixed upper bound of the value axis.
    pub y_max: Option<f64>,
    pub empty_message: String,
}

impl Chart {
    pub fn new(name: impl Into<String>, title: impl Into<String>, plot: Plot) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            plot,
            x_label: None,
            y_label: None,
            y_max: None,
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
        }
    }

    pub fn x_label(mut self, label: impl Into<String>) -> Self {
        self.x_label = Some(label.into());
        self
    }

    pub fn y_label(mut self, label: impl Into<String>) -> Self {
        self.y_label = Some(label.into());
        self
    }

    pub fn y_max(mut self, max: f64) -> Self {
        self.y_max = Some(max);
        self
    }

    pub fn empty_message(mut self, message: impl Into<String>) -> Self {
        self.empty_message = message.into();
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.plot.is_empty()
    }

    pub fn file_name(&self) -> String {
        format!("{}.svg", self.name)
    }
}

/// Where a chart ended up and whether it carried data.
#[derive(Debug, Clone)]
pub struct Written {
    pub path: PathBuf,
    pub placeholder: bool,
}

/// Writes charts into one category directory, overwriting existing files.
#[derive(Debug, Clone)]
pub struct ChartSink {
    dir: PathBuf,
}

impl ChartSink {
    pub fn create(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, chart: &Chart) -> io::Result<Written> {
        let path = self.dir.join(chart.file_name());
        fs::write(&path, render::render(chart))?;
        Ok(Written {
            path,
            placeholder: chart.is_placeholder(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_plots() {
        assert!(Plot::Bar(vec![]).is_empty());
        assert!(Plot::histogram(vec![]).is_empty());
        assert!(Plot::Heatmap {
            rows: vec!["Mon".into()],
            columns: vec!["0".into()],
            cells: vec![vec![0]],
        }
        .is_empty());
        assert!(Plot::Panels(vec![Panel {
            title: "a".into(),
            bars: vec![]
        }])
        .is_empty());
        assert!(!Plot::Bar(vec![("a".into(), 0.0)]).is_empty());
    }

    #[test]
    fn test_sink_creates_directories_and_overwrites() {
        let root = tempfile::tempdir().unwrap();
        let sink = ChartSink::create(root.path().join("nested").join("commits")).unwrap();

        let first = Chart::new("demo", "First", Plot::Bar(vec![("a".into(), 1.0)]));
        let written = sink.write(&first).unwrap();
        assert_eq!(written.path, sink.dir().join("demo.svg"));
        assert!(!written.placeholder);

        let second = Chart::new("demo", "Second", Plot::Bar(vec![]));
        let written = sink.write(&second).unwrap();
        assert!(written.placeholder);

        let contents = fs::read_to_string(&written.path).unwrap();
        assert!(contents.contains("Second"));
        assert!(!contents.contains("First"));
    }
}
