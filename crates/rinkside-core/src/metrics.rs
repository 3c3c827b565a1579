//! Telemetry sink seam.
//!
//! The sink accepts named numeric metrics with dimension tags. The trait
//! is infallible by construction: implementations swallow and log their
//! own export failures, which must never propagate to the caller.

/// Dimension tags attached to a metric observation.
pub type MetricTags<'a> = &'a [(&'static str, String)];

/// Named numeric metrics with dimension tags.
pub trait Metrics: Send + Sync {
    /// Records a measured value (durations, sizes).
    fn record_value(&self, name: &'static str, value: f64, tags: MetricTags<'_>);

    /// Increments a counter by one.
    fn increment(&self, name: &'static str, tags: MetricTags<'_>);
}

/// A sink that drops every observation. Default for contexts where no
/// exporter is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn record_value(&self, _name: &'static str, _value: f64, _tags: MetricTags<'_>) {}

    fn increment(&self, _name: &'static str, _tags: MetricTags<'_>) {}
}
