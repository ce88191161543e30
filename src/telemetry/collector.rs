//! In-process metrics store with facade mirroring.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use super::histogram::{DEFAULT_MAX_SAMPLES, HistogramSummary, Reservoir};
use crate::sync::lock;

/// Canonical identity of a metric series: name plus labels sorted by key.
///
/// `requests_total{endpoint=meps,status=ok}` and the same labels given in
/// the opposite order map to one series. Separators inside label keys and
/// values are backslash-escaped, so distinct label sets never render alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    rendered: String,
    name: String,
}

impl SeriesKey {
    pub fn new(name: &str, labels: &[(&str, &str)]) -> Self {
        let mut rendered = escape(name);
        if !labels.is_empty() {
            let mut sorted = labels.to_vec();
            sorted.sort_unstable();
            let pairs: Vec<String> = sorted
                .iter()
                .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
                .collect();
            rendered.push('{');
            rendered.push_str(&pairs.join(","));
            rendered.push('}');
        }
        Self {
            rendered,
            name: name.to_owned(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | ',' | '=' | '{' | '}') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// Counters, gauges and latency histograms for one client instance.
///
/// Owned by the client and shared (via `Arc`) with the pipeline and the
/// orchestrator. Each operation takes the relevant lock for a single
/// synchronous update; nothing is held across an `.await`.
pub struct MetricsCollector {
    counters: Mutex<HashMap<SeriesKey, u64>>,
    gauges: Mutex<HashMap<SeriesKey, f64>>,
    histograms: Mutex<HashMap<SeriesKey, Reservoir>>,
    max_samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_max_samples(DEFAULT_MAX_SAMPLES)
    }

    /// Create a collector whose histograms retain at most `max_samples`.
    pub fn with_max_samples(max_samples: usize) -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            gauges: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
            max_samples: max_samples.max(1),
        }
    }

    pub fn increment_counter(&self, name: &str, amount: u64, labels: &[(&str, &str)]) {
        *lock(&self.counters)
            .entry(SeriesKey::new(name, labels))
            .or_insert(0) += amount;
        metrics::counter!(name.to_owned(), facade_labels(labels)).increment(amount);
    }

    pub fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        lock(&self.gauges).insert(SeriesKey::new(name, labels), value);
        metrics::gauge!(name.to_owned(), facade_labels(labels)).set(value);
    }

    pub fn observe_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        let max_samples = self.max_samples;
        lock(&self.histograms)
            .entry(SeriesKey::new(name, labels))
            .or_insert_with(|| Reservoir::new(max_samples))
            .observe(value);
        metrics::histogram!(name.to_owned(), facade_labels(labels)).record(value);
    }

    /// Current value of one counter series (0 if never incremented).
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        lock(&self.counters)
            .get(&SeriesKey::new(name, labels))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of a counter across all of its label sets.
    pub fn counter_total(&self, name: &str) -> u64 {
        lock(&self.counters)
            .iter()
            .filter(|(key, _)| key.name() == name)
            .map(|(_, v)| *v)
            .sum()
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        lock(&self.gauges).get(&SeriesKey::new(name, labels)).copied()
    }

    /// Summary of one histogram series, `None` if it has no observations.
    pub fn histogram_summary(&self, name: &str, labels: &[(&str, &str)]) -> Option<HistogramSummary> {
        let reservoir = lock(&self.histograms)
            .get(&SeriesKey::new(name, labels))
            .cloned()?;
        reservoir.summary()
    }

    /// Summaries for every histogram series, sorted by series key.
    pub fn histogram_summaries(&self) -> Vec<(SeriesKey, HistogramSummary)> {
        let snapshot: Vec<(SeriesKey, Reservoir)> = lock(&self.histograms)
            .iter()
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect();
        let mut out: Vec<_> = snapshot
            .into_iter()
            .filter_map(|(k, r)| r.summary().map(|s| (k, s)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Drop every series.
    pub fn reset(&self) {
        lock(&self.counters).clear();
        lock(&self.gauges).clear();
        lock(&self.histograms).clear();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("counters", &lock(&self.counters).len())
            .field("gauges", &lock(&self.gauges).len())
            .field("histograms", &lock(&self.histograms).len())
            .field("max_samples", &self.max_samples)
            .finish()
    }
}

fn facade_labels(labels: &[(&str, &str)]) -> Vec<metrics::Label> {
    labels
        .iter()
        .map(|(k, v)| metrics::Label::new((*k).to_owned(), (*v).to_owned()))
        .collect()
}
