//! Scatter-gather under a shared time budget.
//!
//! Every part runs as its own task. The joint completion of all tasks races a
//! single budget timer. When the timer wins, the task handles are kept and
//! each outstanding task is observed once more (up to the settle grace)
//! instead of being cancelled or re-issued, so at most one physical call per
//! part is ever made.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt, MaybeDone};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use super::result::{AggregateResult, Part};
use super::{AggregatorError, Result};
use crate::invoker::InvokeError;

/// Time allotted to one scatter-gather batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget {
    /// Budget for the whole batch; not a per-call timeout.
    pub total: Duration,
    /// After the budget, how long outstanding tasks may still settle.
    pub settle_grace: Duration,
}

impl TimeBudget {
    pub fn new(total: Duration) -> Self {
        Self {
            total,
            settle_grace: Duration::ZERO,
        }
    }

    pub fn with_settle_grace(mut self, settle_grace: Duration) -> Self {
        self.settle_grace = settle_grace;
        self
    }
}

/// Value produced by one part.
#[derive(Debug, Clone, PartialEq)]
pub struct PartValue {
    pub value: Value,
    /// Set when the value itself is a stand-in, e.g. a breaker fallback.
    pub degraded: bool,
}

impl PartValue {
    pub fn live(value: Value) -> Self {
        Self {
            value,
            degraded: false,
        }
    }

    pub fn degraded(value: Value) -> Self {
        Self {
            value,
            degraded: true,
        }
    }
}

/// Outcome of one part's task.
pub type PartResult = std::result::Result<PartValue, InvokeError>;

struct PartSpec {
    part: Part,
    placeholder: Value,
    task: BoxFuture<'static, PartResult>,
}

struct Slot {
    part: Part,
    placeholder: Value,
    handle: MaybeDone<JoinHandle<PartResult>>,
}

/// A batch of independent parts to run concurrently.
#[derive(Default)]
pub struct ScatterGather {
    parts: Vec<PartSpec>,
}

impl ScatterGather {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a part. `placeholder` stands in for the value if the part is missing.
    pub fn part<F>(mut self, part: Part, placeholder: Value, task: F) -> Self
    where
        F: Future<Output = PartResult> + Send + 'static,
    {
        self.parts.push(PartSpec {
            part,
            placeholder,
            task: task.boxed(),
        });
        self
    }

    /// Run every part and assemble the result.
    ///
    /// Gateway failures and parts that never settle become placeholders and
    /// mark the result degraded. Internal failures and panicked tasks are
    /// returned as [`AggregatorError::Internal`].
    pub async fn gather(self, budget: TimeBudget) -> Result<AggregateResult> {
        let deadline = Instant::now() + budget.total;

        let mut slots: Vec<Slot> = self
            .parts
            .into_iter()
            .map(|spec| Slot {
                part: spec.part,
                placeholder: spec.placeholder,
                handle: future::maybe_done(tokio::spawn(spec.task)),
            })
            .collect();

        let timed_out = {
            let all = future::join_all(slots.iter_mut().map(|slot| &mut slot.handle));
            tokio::select! {
                _ = all => false,
                _ = tokio::time::sleep_until(deadline) => true,
            }
        };

        if timed_out {
            warn!(budget_ms = budget.total.as_millis() as u64, "Budget exceeded, entering degraded mode");
        } else {
            debug!("All parts completed within budget");
        }

        let settle_deadline = deadline + budget.settle_grace;
        let mut degraded = timed_out;
        let mut parts = BTreeMap::new();

        for mut slot in slots {
            let joined = match Pin::new(&mut slot.handle).take_output() {
                Some(output) => Some(output),
                None => match slot.handle {
                    // Same task, observed again; dropping the handle detaches it.
                    MaybeDone::Future(handle) => timeout_at(settle_deadline, handle).await.ok(),
                    _ => None,
                },
            };

            let value = match joined {
                Some(Ok(Ok(part_value))) => {
                    if part_value.degraded {
                        info!(part = %slot.part, "Part returned a degraded value");
                        degraded = true;
                    }
                    part_value.value
                }
                Some(Ok(Err(e))) if e.is_gateway() => {
                    warn!(part = %slot.part, error = %e, "Part failed, using placeholder");
                    degraded = true;
                    slot.placeholder
                }
                Some(Ok(Err(e))) => {
                    return Err(AggregatorError::Internal(format!(
                        "{} part failed: {}",
                        slot.part, e
                    )));
                }
                Some(Err(join_error)) => {
                    return Err(AggregatorError::Internal(format!(
                        "{} task aborted: {}",
                        slot.part, join_error
                    )));
                }
                None => {
                    warn!(part = %slot.part, "Part did not settle, using placeholder");
                    degraded = true;
                    slot.placeholder
                }
            };

            parts.insert(slot.part, value);
        }

        Ok(AggregateResult { parts, degraded })
    }
}
