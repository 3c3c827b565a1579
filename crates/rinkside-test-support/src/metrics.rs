//! Recording `Metrics` sink for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use rinkside_core::metrics::{MetricTags, Metrics};

/// A metrics sink that records every observation for later assertion.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    counters: Mutex<HashMap<String, u64>>,
    values: Mutex<Vec<(String, f64)>>,
}

impl RecordingMetrics {
    /// Current value of a counter (0 if never incremented).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// All recorded values for a metric name, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<f64> {
        self.values
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl Metrics for RecordingMetrics {
    fn record_value(&self, name: &'static str, value: f64, _tags: MetricTags<'_>) {
        self.values.lock().unwrap().push((name.to_owned(), value));
    }

    fn increment(&self, name: &'static str, _tags: MetricTags<'_>) {
        *self.counters.lock().unwrap().entry(name.to_owned()).or_insert(0) += 1;
    }
}
