//! Metric primitives and Prometheus text exposition.
//!
//! Counters and gauges are plain atomics; histograms use fixed bucket
//! bounds with per-bucket atomic counts. Rendering produces the text
//! exposition format (v0.0.4) directly, one `# HELP`/`# TYPE` block per
//! metric.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Content type for the `/metrics` endpoint.
pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// A monotonically increasing counter.
#[derive(Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn render_into(&self, out: &mut String, name: &str, help: &str) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} counter");
        let _ = writeln!(out, "{name} {}", self.get());
    }
}

/// A gauge holding an `f64` as raw bits.
#[derive(Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0.0_f64.to_bits()))
    }

    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Add `delta` (may be negative) with a compare-exchange loop.
    pub fn add(&self, delta: f64) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            });
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn render_into(&self, out: &mut String, name: &str, help: &str) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} gauge");
        let _ = writeln!(out, "{name} {}", self.get());
    }
}

/// A counter family keyed by label values.
///
/// Series are created on first increment. The label value order must
/// match `label_keys`.
pub struct LabeledCounter {
    label_keys: &'static [&'static str],
    series: RwLock<BTreeMap<Vec<String>, Arc<Counter>>>,
}

impl LabeledCounter {
    pub fn new(label_keys: &'static [&'static str]) -> Self {
        Self {
            label_keys,
            series: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn inc(&self, label_values: &[&str]) {
        debug_assert_eq!(label_values.len(), self.label_keys.len());

        // Fast path: series already exists.
        {
            let series = self.series.read().unwrap_or_else(|e| e.into_inner());
            if let Some(c) = series.get(&join_values(label_values)) {
                c.inc();
                return;
            }
        }

        let mut series = self.series.write().unwrap_or_else(|e| e.into_inner());
        series
            .entry(join_values(label_values))
            .or_insert_with(|| Arc::new(Counter::new()))
            .inc();
    }

    pub fn get(&self, label_values: &[&str]) -> u64 {
        let series = self.series.read().unwrap_or_else(|e| e.into_inner());
        series
            .get(&join_values(label_values))
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Sum across all series.
    pub fn total(&self) -> u64 {
        let series = self.series.read().unwrap_or_else(|e| e.into_inner());
        series.values().map(|c| c.get()).sum()
    }

    pub fn render_into(&self, out: &mut String, name: &str, help: &str) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} counter");
        let series = self.series.read().unwrap_or_else(|e| e.into_inner());
        for (values, counter) in series.iter() {
            let labels: Vec<String> = self
                .label_keys
                .iter()
                .zip(values.iter())
                .map(|(k, v)| format!("{k}=\"{v}\""))
                .collect();
            let _ = writeln!(out, "{name}{{{}}} {}", labels.join(","), counter.get());
        }
    }
}

fn join_values(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// A histogram with fixed bucket upper bounds (seconds).
///
/// Bucket counts are stored non-cumulatively and accumulated at render
/// time; the sum is tracked in integer microseconds to stay atomic.
pub struct Histogram {
    bounds: Vec<f64>,
    counts: Vec<AtomicU64>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Default latency buckets: 5ms to 10s.
    pub fn with_default_buckets() -> Self {
        Self::new(&[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    }

    pub fn new(bounds: &[f64]) -> Self {
        // counts has one extra slot for the +Inf bucket.
        let counts = (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            bounds: bounds.to_vec(),
            counts,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, secs: f64) {
        let idx = self
            .bounds
            .iter()
            .position(|b| secs <= *b)
            .unwrap_or(self.bounds.len());
        self.counts[idx].fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add((secs * 1_000_000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum_secs(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    pub fn render_into(&self, out: &mut String, name: &str, help: &str) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} histogram");
        let mut cumulative = 0u64;
        for (bound, count) in self.bounds.iter().zip(self.counts.iter()) {
            cumulative += count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}_bucket{{le=\"{bound}\"}} {cumulative}");
        }
        cumulative += self.counts[self.bounds.len()].load(Ordering::Relaxed);
        let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {cumulative}");
        let _ = writeln!(out, "{name}_sum {}", self.sum_secs());
        let _ = writeln!(out, "{name}_count {}", self.count());
    }
}
