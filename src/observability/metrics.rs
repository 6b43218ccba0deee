//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `operand_bindinfo_reconciliations_total` - Total number of reconciliations
//! - `operand_bindinfo_reconciliation_errors_total` - Total number of reconciliation errors
//! - `operand_bindinfo_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `operand_bindinfo_objects_copied_total{kind}` - Objects copied into consumer namespaces
//! - `operand_bindinfo_source_objects_missing_total{kind}` - Bindings skipped because the source is missing
//! - `operand_bindinfo_requeues_total{reason}` - Requeues scheduled by the error policy

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "operand_bindinfo_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "operand_bindinfo_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "operand_bindinfo_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static OBJECTS_COPIED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "operand_bindinfo_objects_copied_total",
            "Total number of objects copied into requesting namespaces by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create OBJECTS_COPIED_TOTAL metric - this should never happen")
});

static SOURCE_OBJECTS_MISSING_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "operand_bindinfo_source_objects_missing_total",
            "Total number of copies skipped because the source object does not exist",
        ),
        &["kind"],
    )
    .expect("Failed to create SOURCE_OBJECTS_MISSING_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "operand_bindinfo_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register every metric with the private registry served on `/metrics`
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(OBJECTS_COPIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SOURCE_OBJECTS_MISSING_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_objects_copied(kind: &str) {
    OBJECTS_COPIED_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_source_objects_missing(kind: &str) {
    SOURCE_OBJECTS_MISSING_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labelled_counters_are_independent() {
        let secrets_before = OBJECTS_COPIED_TOTAL.with_label_values(&["Secret"]).get();
        increment_objects_copied("Secret");
        increment_source_objects_missing("ConfigMap");
        increment_requeues_total("sync-failed");

        assert!(OBJECTS_COPIED_TOTAL.with_label_values(&["Secret"]).get() > secrets_before);
        assert!(SOURCE_OBJECTS_MISSING_TOTAL.with_label_values(&["ConfigMap"]).get() >= 1);
        assert!(REQUEUES_TOTAL.with_label_values(&["sync-failed"]).get() >= 1);
    }

    #[test]
    fn test_registered_metrics_are_gathered() {
        // Registration is process-wide; another test may have done it already
        let _ = register_metrics();
        increment_reconciliations();
        let text = prometheus::TextEncoder::new()
            .encode_to_string(&REGISTRY.gather())
            .unwrap();
        assert!(text.contains("operand_bindinfo_reconciliations_total"));
    }
}
