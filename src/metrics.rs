//! Aggregation recipes that fold fetched records into chartable summaries.
//!
//! Everything here is pure: callers pass the reference time (`now`) explicitly
//! so results are reproducible.

use crate::types::{Issue, Review};
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;
use std::hash::Hash;

pub const COMMIT_WEIGHT: u64 = 1;
pub const PULL_REQUEST_WEIGHT: u64 = 2;
pub const ISSUE_WEIGHT: u64 = 1;

const WEEKDAYS: usize = 7;
const HOURS: usize = 24;

/// Count-by-key that remembers the order in which keys were first seen.
#[derive(Debug, Clone)]
pub struct Tally<K> {
    entries: Vec<(K, u64)>,
    index: HashMap<K, usize>,
}

impl<K: Eq + Hash + Clone> Default for Tally<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> Tally<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K, amount: u64) {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 += amount,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, amount));
            }
        }
    }

    pub fn incr(&mut self, key: K) {
        self.add(key, 1);
    }

    pub fn get(&self, key: &K) -> u64 {
        self.index.get(key).map_or(0, |&slot| self.entries[slot].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn entries(&self) -> &[(K, u64)] {
        &self.entries
    }

    /// The `n` largest counts, descending. Ties keep first-seen order.
    pub fn most_common(&self, n: usize) -> Vec<(K, u64)> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted.truncate(n);
        sorted
    }
}

impl<K: Display> Tally<K> {
    pub fn into_series(self) -> Vec<(String, f64)> {
        self.entries
            .into_iter()
            .map(|(key, count)| (key.to_string(), count as f64))
            .collect()
    }
}

/// Converts `(key, count)` pairs into a chart series.
pub fn series<K: Display>(pairs: Vec<(K, u64)>) -> Vec<(String, f64)> {
    pairs
        .into_iter()
        .map(|(key, count)| (key.to_string(), count as f64))
        .collect()
}

/// `part / whole`, defined as 0 when `whole` is 0.
pub fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

pub fn percentage(part: u64, whole: u64) -> f64 {
    ratio(part, whole) * 100.0
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_seconds() as f64 / 3600.0
}

pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_seconds() as f64 / 60.0
}

/// Whole days elapsed, truncated toward zero.
pub fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_days()
}

/// Runs of consecutive calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Streak {
    pub longest: u32,
    /// Length of the run containing the latest date.
    pub current: u32,
}

/// Scans the deduplicated, sorted dates. A gap of more than one day restarts
/// the current run at 1.
pub fn streaks<I>(dates: I) -> Streak
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: BTreeSet<NaiveDate> = dates.into_iter().collect();

    let mut streak = Streak::default();
    let mut previous: Option<NaiveDate> = None;

    for day in days {
        streak.current = match previous {
            Some(prev) if prev.succ_opt() == Some(day) => streak.current + 1,
            _ => 1,
        };
        streak.longest = streak.longest.max(streak.current);
        previous = Some(day);
    }

    streak
}

/// Splits an issues listing into pure issues and pull requests.
pub fn partition_issues(items: &[Issue]) -> (Vec<&Issue>, Vec<&Issue>) {
    items.iter().partition(|item| !item.is_pull_request())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Approved,
    Commented,
    Other,
}

impl ReviewState {
    pub fn parse(state: &str) -> Self {
        match state.to_lowercase().as_str() {
            "approved" => ReviewState::Approved,
            "commented" => ReviewState::Commented,
            _ => ReviewState::Other,
        }
    }
}

/// Review actions by one reviewer, classified by state.
///
/// Only approved and commented reviews qualify for karma and approval rate;
/// the approval-rate denominator is `approved + commented`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewTally {
    pub approved: u64,
    pub commented: u64,
    pub other: u64,
}

impl ReviewTally {
    /// Tallies the reviews written by `reviewer` (case-insensitive).
    pub fn by_reviewer<'a, I>(reviews: I, reviewer: &str) -> Self
    where
        I: IntoIterator<Item = &'a Review>,
    {
        let mut tally = Self::default();
        for review in reviews {
            if review
                .reviewer()
                .is_some_and(|login| login.eq_ignore_ascii_case(reviewer))
            {
                tally.record(ReviewState::parse(&review.state));
            }
        }
        tally
    }

    pub fn record(&mut self, state: ReviewState) {
        match state {
            ReviewState::Approved => self.approved += 1,
            ReviewState::Commented => self.commented += 1,
            ReviewState::Other => self.other += 1,
        }
    }

    pub fn merge(&mut self, other: ReviewTally) {
        self.approved += other.approved;
        self.commented += other.commented;
        self.other += other.other;
    }

    pub fn total(&self) -> u64 {
        self.approved + self.commented + self.other
    }

    /// Two points per approval, one per comment.
    pub fn karma(&self) -> u64 {
        self.approved * 2 + self.commented
    }

    pub fn approval_rate(&self) -> f64 {
        percentage(self.approved, self.approved + self.commented)
    }
}

/// Weighted event count per UTC calendar day.
#[derive(Debug, Clone, Default)]
pub struct DailyActivity {
    days: BTreeMap<NaiveDate, u64>,
}

impl DailyActivity {
    pub fn record(&mut self, at: DateTime<Utc>, weight: u64) {
        *self.days.entry(at.date_naive()).or_insert(0) += weight;
    }

    pub fn commit(&mut self, at: DateTime<Utc>) {
        self.record(at, COMMIT_WEIGHT);
    }

    pub fn pull_request(&mut self, at: DateTime<Utc>) {
        self.record(at, PULL_REQUEST_WEIGHT);
    }

    /// Items carrying the pull-request marker are skipped; they are counted
    /// through the pulls listing instead.
    pub fn issue(&mut self, issue: &Issue) {
        if !issue.is_pull_request() {
            self.record(issue.created_at, ISSUE_WEIGHT);
        }
    }

    pub fn get(&self, day: NaiveDate) -> u64 {
        self.days.get(&day).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Ascending by date.
    pub fn into_series(self) -> Vec<(String, f64)> {
        self.days
            .into_iter()
            .map(|(day, score)| (day.format("%Y-%m-%d").to_string(), score as f64))
            .collect()
    }
}

/// Commit counts by weekday (Monday = 0) and hour of day.
#[derive(Debug, Clone, Default)]
pub struct HotTimes {
    cells: [[u64; HOURS]; WEEKDAYS],
}

impl HotTimes {
    pub fn record(&mut self, at: DateTime<Utc>) {
        let weekday = at.weekday().num_days_from_monday() as usize;
        self.cells[weekday][at.hour() as usize] += 1;
    }

    pub fn get(&self, weekday: usize, hour: usize) -> u64 {
        self.cells[weekday][hour]
    }

    pub fn rows(&self) -> Vec<Vec<u64>> {
        self.cells.iter().map(|row| row.to_vec()).collect()
    }
}

/// Per-language amounts bucketed by calendar year.
#[derive(Debug, Clone, Default)]
pub struct LanguageTimeline {
    years: BTreeMap<i32, Tally<String>>,
    languages: Tally<String>,
}

impl LanguageTimeline {
    pub fn add(&mut self, year: i32, language: &str, amount: u64) {
        self.years
            .entry(year)
            .or_default()
            .add(language.to_string(), amount);
        self.languages.add(language.to_string(), amount);
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn years(&self) -> Vec<String> {
        self.years.keys().map(|year| year.to_string()).collect()
    }

    /// One `(language, per-year amounts)` row per language, aligned with `years()`.
    pub fn stacks(&self) -> Vec<(String, Vec<f64>)> {
        self.languages
            .entries()
            .iter()
            .map(|(language, _)| {
                let values = self
                    .years
                    .values()
                    .map(|tally| tally.get(language) as f64)
                    .collect();
                (language.clone(), values)
            })
            .collect()
    }
}

/// Year of the oldest dated entry.
pub fn earliest_year<I>(instants: I) -> Option<i32>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    instants.into_iter().min().map(|at| at.year())
}

/// One histogram bucket covering `[start, end)`; the last bucket is closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

/// Buckets finite values into `bins` equal-width bins spanning min..max.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (low, high) = if max - min > f64::EPSILON {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    };
    let width = (high - low) / bins as f64;

    let mut counts = vec![0u64; bins];
    for value in finite {
        let slot = (((value - low) / width).floor() as usize).min(bins - 1);
        counts[slot] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            start: low + width * i as f64,
            end: low + width * (i + 1) as f64,
            count,
        })
        .collect()
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "this", "that", "into", "are", "was", "were", "has",
    "have", "had", "not", "but", "all", "any", "can", "will", "about", "when", "then", "than",
    "its", "our", "your", "you", "they", "them", "their", "there", "here", "also", "via", "been",
    "being", "more", "some", "such", "only", "just", "out", "off", "over", "per",
];

/// Word counts across commit messages, ignoring short words and stopwords.
pub fn word_frequencies<'a, I>(texts: I) -> Tally<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut words = Tally::new();
    for text in texts {
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .filter(|word| word.chars().count() >= 3)
            .filter(|word| !STOPWORDS.contains(&word.as_str()))
            .filter(|word| !word.chars().all(|c| c.is_ascii_digit()))
        {
            words.incr(word);
        }
    }
    words
}

/// Compound polarity beyond which a message is positive (or, negated, negative).
const SENTIMENT_THRESHOLD: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn from_compound(score: f64) -> Self {
        if score > SENTIMENT_THRESHOLD {
            Sentiment::Positive
        } else if score < -SENTIMENT_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// Messages per sentiment bucket, scored with the VADER lexicon.
///
/// Always three bars in positive/negative/neutral order, or none for no messages.
pub fn sentiment_counts<'a, I>(messages: I) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let analyzer = vader_sentiment::SentimentIntensityAnalyzer::new();
    let mut counts = [0u64; 3];
    let mut seen = false;
    for message in messages {
        seen = true;
        let compound = analyzer
            .polarity_scores(message)
            .get("compound")
            .copied()
            .unwrap_or(0.0);
        let bucket = Sentiment::from_compound(compound);
        if let Some(i) = Sentiment::ALL.iter().position(|s| *s == bucket) {
            counts[i] += 1;
        }
    }
    if !seen {
        return Vec::new();
    }
    Sentiment::ALL
        .iter()
        .zip(counts)
        .map(|(sentiment, count)| (sentiment.label().to_string(), count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn review(login: &str, state: &str) -> Review {
        serde_json::from_value(json!({ "user": { "login": login }, "state": state })).unwrap()
    }

    fn issue(number: u64, created_at: &str, is_pull: bool) -> Issue {
        let mut value = json!({ "number": number, "state": "open", "created_at": created_at });
        if is_pull {
            value["pull_request"] = json!({ "url": "https://api.github.com/pulls/1" });
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_streaks_gap_resets_current() {
        let streak = streaks(vec![
            day(2025, 1, 1),
            day(2025, 1, 2),
            day(2025, 1, 3),
            day(2025, 1, 5),
        ]);

        assert_eq!(streak.longest, 3);
        assert_eq!(streak.current, 1);
    }

    #[test]
    fn test_streaks_ignore_duplicates_and_order() {
        let base = streaks(vec![day(2025, 3, 1), day(2025, 3, 2), day(2025, 3, 4)]);
        let noisy = streaks(vec![
            day(2025, 3, 4),
            day(2025, 3, 2),
            day(2025, 3, 2),
            day(2025, 3, 1),
            day(2025, 3, 4),
        ]);

        assert_eq!(base, noisy);
        assert_eq!(base.longest, 2);
        assert_eq!(base.current, 1);
    }

    #[test]
    fn test_streaks_bounds() {
        assert_eq!(streaks(Vec::new()), Streak::default());

        let single = streaks(vec![day(2024, 2, 29)]);
        assert_eq!(single, Streak { longest: 1, current: 1 });

        // Crossing a month and year boundary still counts as consecutive.
        let run = streaks(vec![day(2024, 12, 30), day(2024, 12, 31), day(2025, 1, 1)]);
        assert_eq!(run, Streak { longest: 3, current: 3 });
        assert!(run.longest >= run.current);
    }

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(5, 0), 0.0);
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(ratio(1, 4), 0.25);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0]), 3.0);
    }

    #[test]
    fn test_tally_most_common_breaks_ties_by_first_seen() {
        let mut labels = Tally::new();
        for (name, count) in [("bug", 5), ("enhancement", 5), ("docs", 2)] {
            labels.add(name.to_string(), count);
        }

        let top = labels.most_common(10);
        let names: Vec<&str> = top.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["bug", "enhancement", "docs"]);
        assert_eq!(top[0].1, 5);
    }

    #[test]
    fn test_tally_accumulates_and_caps() {
        let mut tally = Tally::new();
        for key in ["a", "b", "a", "c", "b", "a"] {
            tally.incr(key);
        }

        assert_eq!(tally.get(&"a"), 3);
        assert_eq!(tally.get(&"z"), 0);
        assert_eq!(tally.total(), 6);
        assert_eq!(tally.most_common(2), vec![("a", 3), ("b", 2)]);
    }

    #[test]
    fn test_review_tally_approval_rate() {
        let reviews = vec![
            review("octo", "APPROVED"),
            review("octo", "approved"),
            review("octo", "COMMENTED"),
            review("octo", "DISMISSED"),
            review("someone-else", "APPROVED"),
        ];

        let tally = ReviewTally::by_reviewer(&reviews, "Octo");
        assert_eq!(tally.approved, 2);
        assert_eq!(tally.commented, 1);
        assert_eq!(tally.other, 1);
        assert_eq!(tally.total(), 4);
        assert!((tally.approval_rate() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(tally.karma(), 5);
    }

    #[test]
    fn test_review_tally_without_qualifying_reviews() {
        let reviews = vec![review("octo", "DISMISSED")];
        let tally = ReviewTally::by_reviewer(&reviews, "octo");
        assert_eq!(tally.approval_rate(), 0.0);
        assert_eq!(tally.karma(), 0);
    }

    #[test]
    fn test_partition_issues_is_disjoint() {
        let items = vec![
            issue(1, "2025-01-01T10:00:00Z", false),
            issue(2, "2025-01-01T11:00:00Z", true),
            issue(3, "2025-01-02T10:00:00Z", false),
        ];

        let (issues, pulls) = partition_issues(&items);
        assert_eq!(issues.iter().map(|i| i.number).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(pulls.iter().map(|i| i.number).collect::<Vec<_>>(), vec![2]);
        assert_eq!(issues.len() + pulls.len(), items.len());
    }

    #[test]
    fn test_daily_activity_weights() {
        let mut activity = DailyActivity::default();
        let morning = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 1, 1, 23, 59, 0).unwrap();

        activity.commit(morning);
        activity.pull_request(late);
        activity.issue(&issue(1, "2025-01-01T12:00:00Z", false));
        activity.issue(&issue(2, "2025-01-01T12:00:00Z", true));
        activity.commit(Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 1).unwrap());

        assert_eq!(activity.get(day(2025, 1, 1)), 4);
        assert_eq!(activity.get(day(2025, 1, 2)), 1);
        assert_eq!(
            activity.into_series(),
            vec![("2025-01-01".to_string(), 4.0), ("2025-01-02".to_string(), 1.0)]
        );
    }

    #[test]
    fn test_hot_times_uses_monday_first_weekday() {
        let mut hot = HotTimes::default();
        // 2025-01-06 is a Monday.
        hot.record(Utc.with_ymd_and_hms(2025, 1, 6, 13, 42, 11).unwrap());
        hot.record(Utc.with_ymd_and_hms(2025, 1, 12, 0, 5, 0).unwrap());

        assert_eq!(hot.get(0, 13), 1);
        assert_eq!(hot.get(6, 0), 1);
        assert_eq!(hot.rows().len(), 7);
        assert_eq!(hot.rows()[0].len(), 24);
    }

    #[test]
    fn test_language_timeline_aligns_years() {
        let mut timeline = LanguageTimeline::default();
        timeline.add(2023, "Rust", 100);
        timeline.add(2021, "Python", 50);
        timeline.add(2023, "Python", 10);

        assert_eq!(timeline.years(), vec!["2021", "2023"]);
        assert_eq!(
            timeline.stacks(),
            vec![
                ("Rust".to_string(), vec![0.0, 100.0]),
                ("Python".to_string(), vec![50.0, 10.0]),
            ]
        );
    }

    #[test]
    fn test_histogram_spans_min_to_max() {
        let bins = histogram(&[0.0, 1.0, 2.0, 10.0], 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].start, 0.0);
        assert_eq!(bins[4].end, 10.0);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 1);
        assert_eq!(bins[4].count, 1);
        assert_eq!(bins.iter().map(|b| b.count).sum::<u64>(), 4);
    }

    #[test]
    fn test_histogram_degenerate_inputs() {
        assert!(histogram(&[], 20).is_empty());
        assert!(histogram(&[f64::NAN], 20).is_empty());

        let same = histogram(&[3.0, 3.0], 4);
        assert_eq!(same.iter().map(|b| b.count).sum::<u64>(), 2);
    }

    #[test]
    fn test_word_frequencies_filters_noise() {
        let words = word_frequencies(["Fix the parser", "fix: parser crash (#42)", "ok"]);
        assert_eq!(words.get(&"fix".to_string()), 2);
        assert_eq!(words.get(&"parser".to_string()), 2);
        assert_eq!(words.get(&"the".to_string()), 0);
        assert_eq!(words.get(&"42".to_string()), 0);
        assert_eq!(words.get(&"ok".to_string()), 0);
    }

    #[test]
    fn test_sentiment_thresholds() {
        assert_eq!(Sentiment::from_compound(0.6), Sentiment::Positive);
        assert_eq!(Sentiment::from_compound(-0.4), Sentiment::Negative);
        assert_eq!(Sentiment::from_compound(0.0), Sentiment::Neutral);
        assert_eq!(Sentiment::from_compound(0.1), Sentiment::Neutral);
        assert_eq!(Sentiment::from_compound(-0.1), Sentiment::Neutral);
    }

    #[test]
    fn test_sentiment_counts_classifies_messages() {
        let counts = sentiment_counts([
            "Great work, this is an awesome improvement",
            "Terrible hack, everything is broken and awful",
            "Rename module",
        ]);
        assert_eq!(
            counts,
            vec![
                ("positive".to_string(), 1.0),
                ("negative".to_string(), 1.0),
                ("neutral".to_string(), 1.0),
            ]
        );
        assert!(sentiment_counts(std::iter::empty::<&str>()).is_empty());
    }

    #[test]
    fn test_time_helpers() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 3, 12, 0, 0).unwrap();
        assert_eq!(hours_between(start, end), 60.0);
        assert_eq!(minutes_between(start, end), 3600.0);
        assert_eq!(days_between(start, end), 2);
        assert_eq!(earliest_year(vec![end, start]), Some(2025));
        assert_eq!(earliest_year(Vec::new()), None);
    }
}
