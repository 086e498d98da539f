//! Metrics recording implementation using Prometheus.

use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry, CounterVec,
    Encoder, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Trait for recording application metrics.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Records a store call and its outcome (`ok`, `error`, `timeout`).
    fn record_store_operation(&self, operation: &str, result: &str);

    /// Records how long a store call took.
    fn record_store_duration(&self, operation: &str, duration_secs: f64);

    /// Records the outcome of a bearer-token check on a protected route.
    fn record_auth_check(&self, result: &str);
}

/// Prometheus metrics collector.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    // Store metrics
    store_operations_total: CounterVec,
    store_operation_duration_seconds: HistogramVec,

    // Auth gate metrics
    auth_checks_total: CounterVec,
}

impl Metrics {
    /// Creates a new metrics instance with a Prometheus registry.
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        let store_operations_total = register_counter_vec_with_registry!(
            Opts::new(
                "store_operations_total",
                "Total number of document store calls"
            ),
            &["operation", "result"],
            registry.clone()
        )
        .expect("Failed to register store_operations_total");

        let store_operation_duration_seconds = register_histogram_vec_with_registry!(
            "store_operation_duration_seconds",
            "Document store call duration in seconds",
            &["operation"],
            vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0
            ],
            registry.clone()
        )
        .expect("Failed to register store_operation_duration_seconds");

        let auth_checks_total = register_counter_vec_with_registry!(
            Opts::new(
                "auth_checks_total",
                "Bearer token checks on protected routes"
            ),
            &["result"],
            registry.clone()
        )
        .expect("Failed to register auth_checks_total");

        Metrics {
            registry,
            store_operations_total,
            store_operation_duration_seconds,
            auth_checks_total,
        }
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .expect("Failed to encode metrics");
        String::from_utf8(buffer).expect("Metrics encoding produced invalid UTF-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder for Metrics {
    fn record_store_operation(&self, operation: &str, result: &str) {
        self.store_operations_total
            .with_label_values(&[operation, result])
            .inc();
    }

    fn record_store_duration(&self, operation: &str, duration_secs: f64) {
        self.store_operation_duration_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    fn record_auth_check(&self, result: &str) {
        self.auth_checks_total.with_label_values(&[result]).inc();
    }
}
