//! Tracing advice for downstream calls.
//!
//! Wraps any [`Downstream`] to emit one event per call carrying the
//! dependency, outcome and latency, without touching the wrapped transport.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::{Downstream, FailureKind, Invocation, Result};

/// Wrapper that logs every invocation made through the inner downstream.
///
/// ```ignore
/// let downstream = Traced::new(HttpDownstream::new(config.services.clone()));
/// ```
pub struct Traced<D> {
    inner: D,
}

impl<D> Traced<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    /// Get a reference to the inner downstream.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Consume the wrapper and return the inner downstream.
    pub fn into_inner(self) -> D {
        self.inner
    }
}

#[async_trait]
impl<D: Downstream> Downstream for Traced<D> {
    async fn invoke(&self, invocation: &Invocation) -> Result<Value> {
        let start = Instant::now();
        let result = self.inner.invoke(invocation).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => info!(
                dependency = %invocation.dependency(),
                path = %invocation.display_path(),
                outcome = "success",
                latency_ms,
                "Downstream call completed"
            ),
            Err(e) => {
                let outcome = match e.kind() {
                    FailureKind::Gateway => "gateway_failure",
                    FailureKind::Internal => "internal_failure",
                };
                warn!(
                    dependency = %invocation.dependency(),
                    path = %invocation.display_path(),
                    outcome,
                    latency_ms,
                    error = %e,
                    "Downstream call failed"
                );
            }
        }

        result
    }
}
