//! Bounded latency reservoir with quickselect percentiles.
//!
//! A [`Reservoir`] keeps at most `max_samples` observations. Once full, each
//! new observation is admitted with probability `max_samples / count` and,
//! when admitted, overwrites a uniformly chosen slot (Algorithm R), so the
//! retained samples stay a uniform subsample of everything observed.
//! `count`, `sum`, `min` and `max` are tracked exactly; percentiles are
//! computed from the subsample.

use std::cmp::Ordering;

use rand::Rng;
use serde::Serialize;

/// Default reservoir size per histogram series.
pub const DEFAULT_MAX_SAMPLES: usize = 1_000;

/// Point-in-time view of a histogram series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramSummary {
    pub count: u64,
    pub sum: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone)]
pub struct Reservoir {
    samples: Vec<f64>,
    max_samples: usize,
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Reservoir {
    /// Create an empty reservoir. A zero size is bumped to one.
    pub fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            samples: Vec::with_capacity(max_samples.min(DEFAULT_MAX_SAMPLES)),
            max_samples,
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Record one observation. NaN is ignored.
    pub fn observe(&mut self, value: f64) {
        self.observe_with(value, &mut rand::thread_rng());
    }

    /// Record one observation using the given random source.
    pub fn observe_with<R: Rng + ?Sized>(&mut self, value: f64, rng: &mut R) {
        if value.is_nan() {
            return;
        }
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        if self.samples.len() < self.max_samples {
            self.samples.push(value);
        } else {
            let slot = rng.gen_range(0..self.count);
            if slot < self.max_samples as u64 {
                self.samples[slot as usize] = value;
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Retained samples, in reservoir order.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Single percentile over the retained samples, `None` when empty.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        let mut scratch = self.samples.clone();
        let k = percentile_index(p, scratch.len())?;
        quickselect(&mut scratch, k)
    }

    /// Summary over the series, `None` when nothing was observed.
    ///
    /// Selection runs on a copy; the reservoir itself is never reordered.
    pub fn summary(&self) -> Option<HistogramSummary> {
        if self.count == 0 || self.samples.is_empty() {
            return None;
        }
        let mut scratch = self.samples.clone();
        let n = scratch.len();
        let mut select = |p: f64| {
            percentile_index(p, n)
                .and_then(|k| quickselect(&mut scratch, k))
                .unwrap_or(0.0)
        };
        let p50 = select(50.0);
        let p95 = select(95.0);
        let p99 = select(99.0);
        Some(HistogramSummary {
            count: self.count,
            sum: self.sum,
            avg: self.sum / self.count as f64,
            min: self.min,
            max: self.max,
            p50,
            p95,
            p99,
        })
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.count = 0;
        self.sum = 0.0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }
}

impl Default for Reservoir {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLES)
    }
}

/// Order-statistic index for percentile `p` over `n` samples:
/// `ceil(p / 100 * n) - 1`, clamped to `[0, n - 1]`. `None` when `n == 0`.
pub fn percentile_index(p: f64, n: usize) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let rank = (p * n as f64 / 100.0).ceil() - 1.0;
    let max = (n - 1) as f64;
    Some(rank.clamp(0.0, max) as usize)
}

/// k-th smallest element (0-based) of `values`, reordering the slice.
///
/// Iterative quickselect with Lomuto partitioning around the middle element.
/// Expected O(n). `k` past the end is clamped; `None` for an empty slice.
pub fn quickselect(values: &mut [f64], k: usize) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let k = k.min(values.len() - 1);
    let mut lo = 0;
    let mut hi = values.len() - 1;
    loop {
        if lo == hi {
            return Some(values[lo]);
        }
        let mid = lo + (hi - lo) / 2;
        let p = partition(values, lo, hi, mid);
        match k.cmp(&p) {
            Ordering::Equal => return Some(values[p]),
            Ordering::Less => hi = p - 1,
            Ordering::Greater => lo = p + 1,
        }
    }
}

fn partition(values: &mut [f64], lo: usize, hi: usize, pivot_idx: usize) -> usize {
    values.swap(pivot_idx, hi);
    let pivot = values[hi];
    let mut store = lo;
    for i in lo..hi {
        if values[i] < pivot {
            values.swap(store, i);
            store += 1;
        }
    }
    values.swap(store, hi);
    store
}
