//! Export metrics
//!
//! The engine reports counters and timers through [`MetricsSink`].
//! [`TracingMetrics`] turns each sample into a `tracing` event on the
//! `quarry::metrics` target; [`InMemoryMetrics`] keeps totals for tests and
//! CLI summaries.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub const EXPORT_DURATION: &str = "export.duration";
pub const EXPORT_ROWS: &str = "export.rows";
pub const EXPORT_ERRORS: &str = "export.errors";

/// Destination for metric samples
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str, value: u64, tags: &[(&str, &str)]);

    fn record_duration(&self, name: &str, duration: Duration, tags: &[(&str, &str)]);
}

fn metric_key(name: &str, tags: &[(&str, &str)]) -> String {
    if tags.is_empty() {
        return name.to_string();
    }
    let tags: Vec<String> = tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{name}{{{}}}", tags.join(","))
}

/// Emits metrics as structured log events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn increment(&self, name: &str, value: u64, tags: &[(&str, &str)]) {
        tracing::info!(
            target: "quarry::metrics",
            metric = %metric_key(name, tags),
            kind = "counter",
            value,
            "metric"
        );
    }

    fn record_duration(&self, name: &str, duration: Duration, tags: &[(&str, &str)]) {
        tracing::info!(
            target: "quarry::metrics",
            metric = %metric_key(name, tags),
            kind = "timer",
            duration_ms = duration.as_millis() as u64,
            "metric"
        );
    }
}

/// Accumulates metrics in memory
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: Mutex<HashMap<String, u64>>,
    timers: Mutex<HashMap<String, Vec<Duration>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter total, zero when never incremented
    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> u64 {
        let key = metric_key(name, tags);
        self.counters
            .lock()
            .map(|c| c.get(&key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Recorded samples for a timer
    pub fn timings(&self, name: &str, tags: &[(&str, &str)]) -> Vec<Duration> {
        let key = metric_key(name, tags);
        self.timers
            .lock()
            .map(|t| t.get(&key).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment(&self, name: &str, value: u64, tags: &[(&str, &str)]) {
        if let Ok(mut counters) = self.counters.lock() {
            *counters.entry(metric_key(name, tags)).or_insert(0) += value;
        }
    }

    fn record_duration(&self, name: &str, duration: Duration, tags: &[(&str, &str)]) {
        if let Ok(mut timers) = self.timers.lock() {
            timers
                .entry(metric_key(name, tags))
                .or_default()
                .push(duration);
        }
    }
}
