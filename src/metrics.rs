//! Prometheus metrics collection for devicegate
//!
//! This module provides metrics instrumentation for tracking:
//! - Candidates selected and skipped per run
//! - Which selection dimension rejected a candidate
//! - Runtime device values that name no known device type or platform
//! - Selection pass latency
//!
//! Metrics are rendered in Prometheus text format with [`Metrics::gather`],
//! e.g. for `devicegate plan --metrics` or a pushgateway job.

use crate::selection::Dimension;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Outcome of a selection decision for metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Candidate passed every predicate and will run
    Selected,
    /// Candidate failed at least one predicate
    Skipped,
}

impl Outcome {
    /// Convert outcome to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Selected => "selected",
            Outcome::Skipped => "skipped",
        }
    }
}

/// Metrics collector for devicegate
///
/// Cloning is cheap and every clone records into the same registry.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    candidates_total: IntCounterVec,
    predicate_rejections: IntCounterVec,
    unknown_runtime_values: IntCounterVec,
    selection_duration: Histogram,
    metrics_recording_failures: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 2 outcomes
        let candidates_total = IntCounterVec::new(
            Opts::new(
                "devicegate_candidates_total",
                "Total number of test candidates evaluated by selection outcome",
            ),
            &["outcome"],
        )?;

        // Cardinality: 4 dimensions. A skipped candidate increments one series
        // per predicate it failed.
        let predicate_rejections = IntCounterVec::new(
            Opts::new(
                "devicegate_predicate_rejections_total",
                "Total number of failed selection predicates by dimension",
            ),
            &["dimension"],
        )?;

        // Only device_type and platform are ever recorded here
        let unknown_runtime_values = IntCounterVec::new(
            Opts::new(
                "devicegate_unknown_runtime_values_total",
                "Runtime device values that name no known device type or platform. \
                Any increment means the device list and the declared enums disagree.",
            ),
            &["dimension"],
        )?;

        let selection_duration = Histogram::with_opts(
            HistogramOpts::new(
                "devicegate_selection_duration_ms",
                "Duration of a full selection pass in milliseconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0]),
        )?;

        let metrics_recording_failures = IntCounterVec::new(
            Opts::new(
                "devicegate_metrics_recording_failures_total",
                "Total number of metrics recording operation failures by operation",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(candidates_total.clone()))?;
        registry.register(Box::new(predicate_rejections.clone()))?;
        registry.register(Box::new(unknown_runtime_values.clone()))?;
        registry.register(Box::new(selection_duration.clone()))?;
        registry.register(Box::new(metrics_recording_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            candidates_total,
            predicate_rejections,
            unknown_runtime_values,
            selection_duration,
            metrics_recording_failures,
        })
    }

    /// Record the outcome of one candidate
    ///
    /// # Errors
    ///
    /// Returns an error if the metric is not registered.
    pub fn record_candidate(&self, outcome: Outcome) -> Result<(), prometheus::Error> {
        self.candidates_total
            .get_metric_with_label_values(&[outcome.as_str()])?
            .inc();
        Ok(())
    }

    /// Record a failed predicate
    pub fn record_rejection(&self, dimension: Dimension) -> Result<(), prometheus::Error> {
        self.predicate_rejections
            .get_metric_with_label_values(&[dimension.as_str()])?
            .inc();
        Ok(())
    }

    /// Record a runtime value that names no known enum member
    pub fn record_unknown_runtime_value(
        &self,
        dimension: Dimension,
    ) -> Result<(), prometheus::Error> {
        self.unknown_runtime_values
            .get_metric_with_label_values(&[dimension.as_str()])?
            .inc();
        Ok(())
    }

    /// Record the duration of a selection pass
    ///
    /// # Errors
    ///
    /// Returns an error if `duration_ms` is NaN, infinite or negative.
    pub fn record_selection_duration(&self, duration_ms: f64) -> Result<(), prometheus::Error> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {}",
                duration_ms
            )));
        }
        self.selection_duration.observe(duration_ms);
        Ok(())
    }

    /// Count a failed recording operation
    ///
    /// Never fails; the label is a fixed operation name.
    pub fn metrics_recording_failure(&self, operation: &str) {
        if let Ok(counter) = self
            .metrics_recording_failures
            .get_metric_with_label_values(&[operation])
        {
            counter.inc();
        }
    }

    /// Current value of the candidate counter for an outcome
    pub fn candidates_count(&self, outcome: Outcome) -> u64 {
        self.candidates_total
            .get_metric_with_label_values(&[outcome.as_str()])
            .map(|counter| counter.get())
            .unwrap_or(0)
    }

    /// Current value of the rejection counter for a dimension
    pub fn rejections_count(&self, dimension: Dimension) -> u64 {
        self.predicate_rejections
            .get_metric_with_label_values(&[dimension.as_str()])
            .map(|counter| counter.get())
            .unwrap_or(0)
    }

    /// Current value of the unknown-value counter for a dimension
    pub fn unknown_runtime_values_count(&self, dimension: Dimension) -> u64 {
        self.unknown_runtime_values
            .get_metric_with_label_values(&[dimension.as_str()])
            .map(|counter| counter.get())
            .unwrap_or(0)
    }

    /// Sum of recorded failures across all operations
    pub fn metrics_recording_failures_count(&self) -> u64 {
        let metric_families = self.registry.gather();
        metric_families
            .iter()
            .find(|mf| mf.name() == "devicegate_metrics_recording_failures_total")
            .map(|mf| {
                mf.get_metric()
                    .iter()
                    .map(|m| m.counter.value.unwrap_or(0.0) as u64)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Render all metrics in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();

        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            tracing::error!(
                error = %e,
                metric_family_count = metric_count,
                "Prometheus text encoder failed"
            );
            prometheus::Error::Msg(format!(
                "Failed to encode {} metric families: {}",
                metric_count, e
            ))
        })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }
}
