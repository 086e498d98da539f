//! Bounded access to the configured store.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::warn;

use super::Store;
use crate::error::StoreError;
use crate::metrics::{Metrics, MetricsRecorder};

/// Owns the store handle and applies the per-call timeout. Cloning is cheap.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn Store>,
    timeout: Duration,
    metrics: Metrics,
}

impl Database {
    pub fn new(store: Arc<dyn Store>, timeout: Duration, metrics: Metrics) -> Self {
        Database {
            store,
            timeout,
            metrics,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Awaits a store call for at most the configured timeout and records its
    /// outcome under `operation`.
    pub async fn run<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let started = Instant::now();
        let result = match timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Store call '{}' on {} timed out after {:?}",
                    operation,
                    self.store.backend_name(),
                    self.timeout
                );
                Err(StoreError::Timeout(self.timeout))
            }
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(StoreError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        self.metrics.record_store_operation(operation, outcome);
        self.metrics
            .record_store_duration(operation, started.elapsed().as_secs_f64());
        result
    }
}
