//! SVG rendering for `Chart`.

use crate::chart::{Chart, Panel, Plot, Series};
use crate::metrics;

#[derive(Clone, Copy)]
struct Theme {
    bg: &'static str,
    title: &'static str,
    text: &'static str,
    muted: &'static str,
    grid: &'static str,
    palette: &'static [&'static str],
    heat: [(u8, u8, u8); 3],
}

const THEME: Theme = Theme {
    bg: "#ffffff",
    title: "#24292f",
    text: "#333333",
    muted: "#6e7781",
    grid: "#d8dee4",
    palette: &[
        "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
        "#bcbd22", "#17becf",
    ],
    heat: [(255, 255, 217), (65, 182, 196), (8, 29, 88)],
};

const TITLE_HEIGHT: f64 = 50.0;
const CHAR_WIDTH: f64 = 6.5;
const MAX_X_TICKS: usize = 12;

#[derive(Clone, Copy, Debug)]
struct Frame {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

impl Frame {
    fn right(&self) -> f64 {
        self.x + self.w
    }

    fn bottom(&self) -> f64 {
        self.y + self.h
    }
}

pub fn render(chart: &Chart) -> String {
    if chart.plot.is_empty() {
        return placeholder(&chart.title, &chart.empty_message);
    }

    let (width, height) = canvas(&chart.plot);
    let frame = Frame {
        x: 70.0,
        y: TITLE_HEIGHT + 10.0,
        w: width - 70.0 - 30.0,
        h: height - TITLE_HEIGHT - 10.0 - 90.0,
    };

    let mut body = String::new();
    match &chart.plot {
        Plot::Bar(bars) => bar_chart(&mut body, frame, bars, chart.y_max),
        Plot::HorizontalBar(bars) => horizontal_bar_chart(&mut body, frame, bars),
        Plot::Histogram { values, bins } => histogram_chart(&mut body, frame, values, *bins),
        Plot::StackedBar { categories, series } => {
            stacked_bar_chart(&mut body, frame, categories, series)
        }
        Plot::Heatmap {
            rows,
            columns,
            cells,
        } => heatmap(&mut body, frame, rows, columns, cells),
        Plot::Line(points) => line_chart(&mut body, frame, points),
        Plot::WordCloud(words) => word_cloud(&mut body, frame, words),
        Plot::Panels(panels) => panel_charts(&mut body, frame, panels),
        Plot::Text(lines) => text_block(&mut body, width, height, lines),
    }

    if let Some(label) = &chart.x_label {
        body.push_str(&text(
            width / 2.0,
            height - 12.0,
            label,
            12.0,
            THEME.text,
            "middle",
        ));
    }
    if let Some(label) = &chart.y_label {
        body.push_str(&format!(
            r#"<text transform="translate(16, {:.1}) rotate(-90)" fill="{}" font-size="12" text-anchor="middle">{}</text>"#,
            frame.y + frame.h / 2.0,
            THEME.text,
            escape(label)
        ));
    }

    document(width, height, &chart.title, &body)
}

fn canvas(plot: &Plot) -> (f64, f64) {
    match plot {
        Plot::StackedBar { .. } | Plot::WordCloud(_) => (1000.0, 500.0),
        Plot::Heatmap { .. } => (1200.0, 600.0),
        Plot::Line(_) => (1000.0, 400.0),
        Plot::Panels(_) => (1200.0, 400.0),
        _ => (800.0, 400.0),
    }
}

fn document(width: f64, height: f64, title: &str, body: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
  <style>
    text {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif; }}
  </style>
  <rect width="{w}" height="{h}" fill="{bg}"/>
  <text x="{cx}" y="32" fill="{title_color}" font-size="18" font-weight="600" text-anchor="middle">{title}</text>
  {body}
</svg>"#,
        w = width,
        h = height,
        bg = THEME.bg,
        cx = width / 2.0,
        title_color = THEME.title,
        title = escape(title),
        body = body
    )
}

/// Title plus a centered explanatory message; emitted for any empty plot.
pub fn placeholder(title: &str, message: &str) -> String {
    let body = text(400.0, 210.0, message, 14.0, THEME.muted, "middle");
    document(800.0, 400.0, title, &body)
}

fn bar_chart(out: &mut String, frame: Frame, bars: &[(String, f64)], y_max: Option<f64>) {
    let max = y_max.unwrap_or_else(|| max_value(bars.iter().map(|(_, v)| *v)));
    value_axis(out, frame, max);

    let band = frame.w / bars.len() as f64;
    for (i, (label, value)) in bars.iter().enumerate() {
        let h = scale(*value, max, frame.h);
        let x = frame.x + band * i as f64 + band * 0.15;
        let w = band * 0.7;
        out.push_str(&rect(x, frame.bottom() - h, w, h, color(i)));
        out.push_str(&text(
            x + w / 2.0,
            frame.bottom() - h - 4.0,
            &format_value(*value),
            10.0,
            THEME.text,
            "middle",
        ));
        out.push_str(&category_label(x + w / 2.0, frame.bottom() + 14.0, label));
    }
}

fn horizontal_bar_chart(out: &mut String, frame: Frame, bars: &[(String, f64)]) {
    let longest = bars
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let label_width = (longest as f64 * CHAR_WIDTH + 12.0).min(280.0);
    let frame = Frame {
        x: 20.0 + label_width,
        y: frame.y,
        w: frame.right() - 20.0 - label_width - 40.0,
        h: frame.h + 40.0,
    };

    let max = max_value(bars.iter().map(|(_, v)| *v));
    out.push_str(&line(frame.x, frame.y, frame.x, frame.bottom(), THEME.muted));

    let band = frame.h / bars.len() as f64;
    for (i, (label, value)) in bars.iter().enumerate() {
        let w = scale(*value, max, frame.w);
        let y = frame.y + band * i as f64 + band * 0.15;
        let h = band * 0.7;
        out.push_str(&rect(frame.x, y, w, h, color(0)));
        out.push_str(&text(
            frame.x - 6.0,
            y + h / 2.0 + 4.0,
            &truncate(label, 40),
            11.0,
            THEME.text,
            "end",
        ));
        out.push_str(&text(
            frame.x + w + 4.0,
            y + h / 2.0 + 4.0,
            &format_value(*value),
            10.0,
            THEME.text,
            "start",
        ));
    }
}

fn histogram_chart(out: &mut String, frame: Frame, values: &[f64], bins: usize) {
    let bins = metrics::histogram(values, bins);
    let max = max_value(bins.iter().map(|bin| bin.count as f64));
    value_axis(out, frame, max);

    let band = frame.w / bins.len() as f64;
    let tick_every = bins.len().div_ceil(5).max(1);
    for (i, bin) in bins.iter().enumerate() {
        let h = scale(bin.count as f64, max, frame.h);
        let x = frame.x + band * i as f64;
        out.push_str(&rect(x, frame.bottom() - h, band - 1.0, h, color(0)));
        if i % tick_every == 0 {
            out.push_str(&text(
                x,
                frame.bottom() + 14.0,
                &format_value(bin.start),
                10.0,
                THEME.text,
                "middle",
            ));
        }
    }
    if let Some(last) = bins.last() {
        out.push_str(&text(
            frame.right(),
            frame.bottom() + 14.0,
            &format_value(last.end),
            10.0,
            THEME.text,
            "middle",
        ));
    }
}

fn stacked_bar_chart(out: &mut String, frame: Frame, categories: &[String], series: &[Series]) {
    let legend_width = 160.0;
    let frame = Frame {
        w: frame.w - legend_width,
        ..frame
    };

    let totals: Vec<f64> = (0..categories.len())
        .map(|i| {
            series
                .iter()
                .map(|s| s.values.get(i).copied().unwrap_or(0.0))
                .sum()
        })
        .collect();
    let max = max_value(totals.iter().copied());
    value_axis(out, frame, max);

    let band = frame.w / categories.len() as f64;
    for (i, category) in categories.iter().enumerate() {
        let x = frame.x + band * i as f64 + band * 0.15;
        let w = band * 0.7;
        let mut base = frame.bottom();
        for (j, s) in series.iter().enumerate() {
            let value = s.values.get(i).copied().unwrap_or(0.0);
            let h = scale(value, max, frame.h);
            if h > 0.0 {
                out.push_str(&rect(x, base - h, w, h, color(j)));
            }
            base -= h;
        }
        out.push_str(&category_label(x + w / 2.0, frame.bottom() + 14.0, category));
    }

    for (j, s) in series.iter().enumerate() {
        let y = frame.y + j as f64 * 18.0;
        let x = frame.right() + 20.0;
        out.push_str(&rect(x, y, 12.0, 12.0, color(j)));
        out.push_str(&text(
            x + 18.0,
            y + 10.0,
            &truncate(&s.name, 20),
            11.0,
            THEME.text,
            "start",
        ));
    }
}

fn heatmap(out: &mut String, frame: Frame, rows: &[String], columns: &[String], cells: &[Vec<u64>]) {
    let max = cells.iter().flatten().copied().max().unwrap_or(0).max(1) as f64;
    let cell_w = frame.w / columns.len().max(1) as f64;
    let cell_h = frame.h / rows.len().max(1) as f64;

    for (r, row) in rows.iter().enumerate() {
        let y = frame.y + cell_h * r as f64;
        out.push_str(&text(
            frame.x - 8.0,
            y + cell_h / 2.0 + 4.0,
            row,
            11.0,
            THEME.text,
            "end",
        ));
        for (c, _) in columns.iter().enumerate() {
            let count = cells.get(r).and_then(|row| row.get(c)).copied().unwrap_or(0);
            let x = frame.x + cell_w * c as f64;
            out.push_str(&rect(x, y, cell_w, cell_h, &heat_color(count as f64 / max)));
            if count > 0 {
                let fill = if count as f64 / max > 0.5 { "#ffffff" } else { THEME.text };
                out.push_str(&text(
                    x + cell_w / 2.0,
                    y + cell_h / 2.0 + 4.0,
                    &count.to_string(),
                    10.0,
                    fill,
                    "middle",
                ));
            }
        }
    }
    for (c, column) in columns.iter().enumerate() {
        out.push_str(&text(
            frame.x + cell_w * c as f64 + cell_w / 2.0,
            frame.bottom() + 14.0,
            column,
            10.0,
            THEME.text,
            "middle",
        ));
    }
}

fn line_chart(out: &mut String, frame: Frame, points: &[(String, f64)]) {
    let max = max_value(points.iter().map(|(_, v)| *v));
    value_axis(out, frame, max);

    let step = if points.len() > 1 {
        frame.w / (points.len() - 1) as f64
    } else {
        0.0
    };
    let position = |i: usize, value: f64| {
        let x = if points.len() > 1 {
            frame.x + step * i as f64
        } else {
            frame.x + frame.w / 2.0
        };
        (x, frame.bottom() - scale(value, max, frame.h))
    };

    let path: Vec<String> = points
        .iter()
        .enumerate()
        .map(|(i, (_, value))| {
            let (x, y) = position(i, *value);
            format!("{:.1},{:.1}", x, y)
        })
        .collect();
    out.push_str(&format!(
        r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
        path.join(" "),
        color(0)
    ));

    let label_every = points.len().div_ceil(MAX_X_TICKS).max(1);
    for (i, (label, value)) in points.iter().enumerate() {
        let (x, y) = position(i, *value);
        out.push_str(&format!(
            r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"/>"#,
            x,
            y,
            color(0)
        ));
        if i % label_every == 0 {
            out.push_str(&category_label(x, frame.bottom() + 14.0, label));
        }
    }
}

fn word_cloud(out: &mut String, frame: Frame, words: &[(String, u64)]) {
    let max = words.iter().map(|(_, count)| *count).max().unwrap_or(1).max(1) as f64;
    let frame = Frame {
        x: 30.0,
        w: frame.right() - 30.0,
        h: frame.h + 70.0,
        ..frame
    };

    let base_size = |count: u64| 12.0 + 36.0 * (count as f64 / max);
    let word_width = |word: &str, size: f64| word.chars().count() as f64 * size * 0.6;
    // Shrink every word alike until the estimated footprint fits the frame.
    let needed: f64 = words
        .iter()
        .map(|(word, count)| {
            let size = base_size(*count);
            (word_width(word, size) + 14.0) * size * 1.1
        })
        .sum();
    let fit = (0.6 * frame.w * frame.h / needed.max(1.0)).sqrt().min(1.0);

    let mut x = frame.x;
    let mut baseline = frame.y + 40.0;
    let mut line_height: f64 = 0.0;
    for (i, (word, count)) in words.iter().enumerate() {
        let size = base_size(*count) * fit;
        let width = word_width(word, size);
        if x + width > frame.right() && x > frame.x {
            x = frame.x;
            baseline += line_height * 1.1;
            line_height = 0.0;
        }
        if baseline > frame.bottom() {
            break;
        }
        out.push_str(&text(x, baseline, word, size, color(i), "start"));
        x += width + 14.0;
        line_height = line_height.max(size);
    }
}

fn panel_charts(out: &mut String, frame: Frame, panels: &[Panel]) {
    let gap = 60.0;
    let width = (frame.w - gap * (panels.len() as f64 - 1.0)) / panels.len() as f64;
    for (i, panel) in panels.iter().enumerate() {
        let sub = Frame {
            x: frame.x + (width + gap) * i as f64,
            y: frame.y + 20.0,
            w: width,
            h: frame.h - 20.0,
        };
        out.push_str(&text(
            sub.x + sub.w / 2.0,
            frame.y + 4.0,
            &panel.title,
            13.0,
            THEME.title,
            "middle",
        ));
        if panel.bars.is_empty() {
            out.push_str(&text(
                sub.x + sub.w / 2.0,
                sub.y + sub.h / 2.0,
                "No data",
                12.0,
                THEME.muted,
                "middle",
            ));
        } else {
            bar_chart(out, sub, &panel.bars, None);
        }
    }
}

fn text_block(out: &mut String, width: f64, height: f64, lines: &[String]) {
    let start = height / 2.0 - (lines.len() as f64 - 1.0) * 11.0;
    for (i, content) in lines.iter().enumerate() {
        out.push_str(&text(
            width / 2.0,
            start + i as f64 * 22.0,
            content,
            14.0,
            THEME.text,
            "middle",
        ));
    }
}

/// Left axis with five evenly spaced gridlines from 0 to `max`.
fn value_axis(out: &mut String, frame: Frame, max: f64) {
    for k in 0..=4 {
        let value = max * k as f64 / 4.0;
        let y = frame.bottom() - frame.h * k as f64 / 4.0;
        out.push_str(&line(frame.x, y, frame.right(), y, THEME.grid));
        out.push_str(&text(
            frame.x - 6.0,
            y + 4.0,
            &format_value(value),
            10.0,
            THEME.muted,
            "end",
        ));
    }
    out.push_str(&line(frame.x, frame.y, frame.x, frame.bottom(), THEME.muted));
    out.push_str(&line(
        frame.x,
        frame.bottom(),
        frame.right(),
        frame.bottom(),
        THEME.muted,
    ));
}

fn category_label(x: f64, y: f64, label: &str) -> String {
    format!(
        r#"<text transform="translate({:.1}, {:.1}) rotate(-40)" fill="{}" font-size="10" text-anchor="end">{}</text>"#,
        x,
        y,
        THEME.text,
        escape(&truncate(label, 24))
    )
}

fn rect(x: f64, y: f64, w: f64, h: f64, fill: &str) -> String {
    format!(
        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
        x,
        y,
        w.max(0.0),
        h.max(0.0),
        fill
    )
}

fn line(x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str) -> String {
    format!(
        r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="1"/>"#,
        x1, y1, x2, y2, stroke
    )
}

fn text(x: f64, y: f64, content: &str, size: f64, fill: &str, anchor: &str) -> String {
    format!(
        r#"<text x="{:.1}" y="{:.1}" fill="{}" font-size="{:.0}" text-anchor="{}">{}</text>"#,
        x,
        y,
        fill,
        size,
        anchor,
        escape(content)
    )
}

fn color(i: usize) -> &'static str {
    THEME.palette[i % THEME.palette.len()]
}

/// Three-stop yellow/green/blue ramp; `t` is clamped to 0..=1.
fn heat_color(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    let [low, mid, high] = THEME.heat;
    let (from, to, local) = if t < 0.5 {
        (low, mid, t * 2.0)
    } else {
        (mid, high, (t - 0.5) * 2.0)
    };
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * local).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        lerp(from.0, to.0),
        lerp(from.1, to.1),
        lerp(from.2, to.2)
    )
}

fn max_value<I: Iterator<Item = f64>>(values: I) -> f64 {
    let max = values.filter(|v| v.is_finite()).fold(0.0, f64::max);
    if max > 0.0 {
        max
    } else {
        1.0
    }
}

fn scale(value: f64, max: f64, length: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value.max(0.0) / max).min(1.0) * length
}

fn format_value(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if magnitude >= 1000.0 {
        format!("{:.1}k", value / 1000.0)
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

fn truncate(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let kept: String = label.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(label: &str, value: f64) -> (String, f64) {
        (label.to_string(), value)
    }

    #[test]
    fn test_empty_chart_renders_placeholder() {
        let chart = Chart::new("top_files", "Top Files", Plot::HorizontalBar(vec![]))
            .empty_message("No files found");
        let svg = render(&chart);

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Top Files"));
        assert!(svg.contains("No files found"));
        assert!(!svg.contains("<polyline"));
    }

    #[test]
    fn test_every_empty_plot_kind_renders() {
        let plots = vec![
            Plot::Bar(vec![]),
            Plot::HorizontalBar(vec![]),
            Plot::histogram(vec![]),
            Plot::StackedBar {
                categories: vec![],
                series: vec![],
            },
            Plot::Heatmap {
                rows: vec![],
                columns: vec![],
                cells: vec![],
            },
            Plot::Line(vec![]),
            Plot::WordCloud(vec![]),
            Plot::Panels(vec![]),
            Plot::Text(vec![]),
        ];
        for plot in plots {
            let svg = render(&Chart::new("x", "Empty", plot));
            assert!(svg.contains(crate::chart::DEFAULT_EMPTY_MESSAGE));
            assert!(svg.trim_end().ends_with("</svg>"));
        }
    }

    #[test]
    fn test_bar_chart_escapes_labels() {
        let chart = Chart::new(
            "labels",
            "Labels <&>",
            Plot::Bar(vec![bar("good first issue", 3.0), bar("a<b", 1.0)]),
        );
        let svg = render(&chart);

        assert!(svg.contains("Labels &lt;&amp;&gt;"));
        assert!(svg.contains("a&lt;b"));
        assert!(!svg.contains("a<b"));
        assert_eq!(svg.matches(r##"fill="#1f77b4""##).count(), 1);
    }

    #[test]
    fn test_single_point_line_and_histogram() {
        let line = render(&Chart::new(
            "activity",
            "Activity",
            Plot::Line(vec![bar("2025-01-01", 4.0)]),
        ));
        assert!(line.contains("<polyline"));
        assert!(line.contains("<circle"));

        let hist = render(&Chart::new("ages", "Ages", Plot::histogram(vec![5.0])));
        assert!(hist.contains("<rect"));
        assert!(!hist.contains("NaN"));
    }

    #[test]
    fn test_heatmap_and_stacked_render_legend() {
        let heat = render(&Chart::new(
            "hot",
            "Hot",
            Plot::Heatmap {
                rows: vec!["Mon".into(), "Tue".into()],
                columns: vec!["0".into(), "1".into()],
                cells: vec![vec![0, 2], vec![1, 0]],
            },
        ));
        assert!(heat.contains("Mon"));
        assert!(heat.contains(&heat_color(1.0)));

        let stacked = render(&Chart::new(
            "langs",
            "Langs",
            Plot::StackedBar {
                categories: vec!["2023".into()],
                series: vec![
                    Series {
                        name: "Rust".into(),
                        values: vec![3.0],
                    },
                    Series {
                        name: "Go".into(),
                        values: vec![1.0],
                    },
                ],
            },
        ));
        assert!(stacked.contains(">Rust<"));
        assert!(stacked.contains(">Go<"));
    }

    #[test]
    fn test_word_cloud_places_every_word() {
        let words: Vec<(String, u64)> = (0..100)
            .map(|i| (format!("word{}", i), 100 - i))
            .collect();
        let svg = render(&Chart::new("cloud", "Cloud", Plot::WordCloud(words)));

        for i in 0..100 {
            assert!(svg.contains(&format!(">word{}<", i)), "word{} missing", i);
        }
    }

    #[test]
    fn test_heat_color_ramp_endpoints() {
        assert_eq!(heat_color(0.0), "#ffffd9");
        assert_eq!(heat_color(1.0), "#081d58");
        assert_eq!(heat_color(7.0), "#081d58");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(12.0), "12");
        assert_eq!(format_value(66.666), "66.7");
        assert_eq!(format_value(1500.0), "1.5k");
        assert_eq!(format_value(2_500_000.0), "2.5M");
    }
}
