use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::record_store::{ErrorKind, RecordFailure};

// ============================================================================
// Metrics Module - Prometheus metrics for the notes service
// ============================================================================
//
// Provides:
// - Record store operations by outcome (ok or error kind)
// - Operation latency as seen by the HTTP layer
// - Batch create rejections by error kind
//
// Exposed in Prometheus text format on /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub operations_total: IntCounterVec,
    pub operation_duration: HistogramVec,

    pub post_records_accepted: IntCounter,
    pub post_failures_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new("notes_operations_total", "Record store operations by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "notes_operation_duration_seconds",
                "Record store operation duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let post_records_accepted = IntCounter::new(
            "notes_post_records_accepted_total",
            "Records created by batch posts",
        )?;
        registry.register(Box::new(post_records_accepted.clone()))?;

        let post_failures_total = IntCounterVec::new(
            Opts::new("notes_post_failures_total", "Records rejected by batch posts"),
            &["kind"],
        )?;
        registry.register(Box::new(post_failures_total.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            operation_duration,
            post_records_accepted,
            post_failures_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one finished operation; `error` is `None` on success
    pub fn record_operation(&self, operation: &str, duration_secs: f64, error: Option<ErrorKind>) {
        let outcome = error.map_or("ok", |kind| kind.as_str());
        self.operations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.operation_duration
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    pub fn record_post(&self, accepted: usize, failures: &[RecordFailure]) {
        self.post_records_accepted.inc_by(accepted as u64);
        for failure in failures {
            self.post_failures_total
                .with_label_values(&[failure.kind.as_str()])
                .inc();
        }
    }

    /// Text exposition of everything registered
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_store::RecordError;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation("get", 0.01, None);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_operation_by_outcome() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation("put", 0.02, None);
        metrics.record_operation("put", 0.01, Some(ErrorKind::NotFound));
        metrics.record_operation("put", 0.01, Some(ErrorKind::NotFound));

        let gathered = metrics.registry.gather();
        let ops = gathered.iter().find(|m| m.name() == "notes_operations_total").unwrap();
        assert_eq!(ops.metric.len(), 2); // ok + not_found

        let text = String::from_utf8(metrics.encode().unwrap()).unwrap();
        assert!(text.contains(r#"outcome="not_found""#));
    }

    #[test]
    fn test_record_post() {
        let metrics = Metrics::new().unwrap();
        let failures = vec![
            RecordFailure::new(0, "a", RecordError::AlreadyExists("a".to_string())),
            RecordFailure::new(1, "b", RecordError::AlreadyExists("b".to_string())),
        ];
        metrics.record_post(3, &failures);

        let gathered = metrics.registry.gather();
        let accepted = gathered
            .iter()
            .find(|m| m.name() == "notes_post_records_accepted_total")
            .unwrap();
        assert_eq!(accepted.metric[0].counter.value, Some(3.0));

        let rejected = gathered.iter().find(|m| m.name() == "notes_post_failures_total").unwrap();
        assert_eq!(rejected.metric[0].counter.value, Some(2.0));
    }
}
