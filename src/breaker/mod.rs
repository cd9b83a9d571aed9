//! Circuit breaker for volatile downstream dependencies.
//!
//! # States
//! - Closed: every call runs; failures are counted against the request volume
//! - Open: calls are short-circuited to the fallback until the cooldown elapses
//! - HalfOpen: calls run again as probes
//!
//! # State Transitions
//! ```text
//! Closed   → Open:     total >= request_volume_threshold
//!                      and failures / total > failure_threshold
//! Open     → HalfOpen: first call after cooldown (counters reset)
//! HalfOpen → Closed:   successes >= half_open_requests (counters reset)
//! HalfOpen → Open:     failures >= half_open_requests (last failure refreshed)
//! ```
//!
//! One breaker exists per protected dependency and is shared by every request
//! through [`BreakerRegistry`]. `fire()` never returns the operation's error:
//! failures are recorded and replaced by the fallback value.

mod registry;

use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::invoker::Dependency;

pub use registry::{BreakerRegistry, BreakerRegistryBuilder};

/// Default failure ratio above which a closed breaker opens.
pub const DEFAULT_FAILURE_THRESHOLD: f64 = 0.5;
/// Default number of calls observed before the failure ratio is evaluated.
pub const DEFAULT_REQUEST_VOLUME_THRESHOLD: u32 = 20;
/// Default time an open breaker waits before probing.
pub const DEFAULT_COOLDOWN_MS: u64 = 30_000;
/// Default probe outcomes needed to leave half-open.
pub const DEFAULT_HALF_OPEN_REQUESTS: u32 = 5;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Counters scoped to the current state period.
#[derive(Debug, Clone, Copy, Default)]
pub struct BreakerCounters {
    pub success_count: u32,
    pub failure_count: u32,
    pub last_failure: Option<Instant>,
}

impl BreakerCounters {
    fn reset(&mut self) {
        self.success_count = 0;
        self.failure_count = 0;
    }

    fn total(&self) -> u32 {
        self.success_count + self.failure_count
    }
}

/// Thresholds for one protected dependency. Read once at startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Failure ratio (0..=1) that must be exceeded to open.
    pub failure_threshold: f64,
    /// Minimum calls in the closed period before the ratio is evaluated.
    pub request_volume_threshold: u32,
    /// Milliseconds an open breaker short-circuits before probing.
    pub cooldown_ms: u64,
    /// Successes needed to close, or failures needed to reopen, from half-open.
    pub half_open_requests: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            request_volume_threshold: DEFAULT_REQUEST_VOLUME_THRESHOLD,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            half_open_requests: DEFAULT_HALF_OPEN_REQUESTS,
        }
    }
}

impl BreakerSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Check value ranges, returning a description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.failure_threshold) {
            return Err(format!(
                "failure_threshold must be within 0..=1, got {}",
                self.failure_threshold
            ));
        }
        if self.request_volume_threshold == 0 {
            return Err("request_volume_threshold must be greater than 0".to_string());
        }
        if self.half_open_requests == 0 {
            return Err("half_open_requests must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Value-producing fallback stored with the breaker.
pub type Fallback<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// What a `fire()` call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Fired<T> {
    /// The protected operation succeeded.
    Live(T),
    /// The breaker substituted its fallback (open, or the operation failed).
    Fallback(T),
}

impl<T> Fired<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Fired::Fallback(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Fired::Live(v) | Fired::Fallback(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Fired::Live(v) | Fired::Fallback(v) => v,
        }
    }
}

/// Point-in-time view of a breaker, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub success_count: u32,
    pub failure_count: u32,
    /// Closed or HalfOpen to Open transitions since creation.
    pub times_opened: u32,
}

#[derive(Debug)]
struct Core {
    state: BreakerState,
    counters: BreakerCounters,
    times_opened: u32,
}

/// Outcome of the pre-call check.
enum Admission {
    Proceed,
    ShortCircuit,
}

impl Core {
    fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            counters: BreakerCounters::default(),
            times_opened: 0,
        }
    }

    fn transition(&mut self, to: BreakerState) -> (BreakerState, BreakerState) {
        let from = self.state;
        if to == BreakerState::Open {
            self.times_opened += 1;
        }
        self.state = to;
        (from, to)
    }

    fn admit(
        &mut self,
        now: Instant,
        settings: &BreakerSettings,
    ) -> (Admission, Option<(BreakerState, BreakerState)>) {
        if self.state != BreakerState::Open {
            return (Admission::Proceed, None);
        }

        let cooled_down = self
            .counters
            .last_failure
            .map(|at| now.saturating_duration_since(at) > settings.cooldown())
            .unwrap_or(true);

        if cooled_down {
            self.counters.reset();
            let change = self.transition(BreakerState::HalfOpen);
            (Admission::Proceed, Some(change))
        } else {
            (Admission::ShortCircuit, None)
        }
    }

    fn record_success(&mut self, settings: &BreakerSettings) -> Option<(BreakerState, BreakerState)> {
        match self.state {
            BreakerState::Closed => {
                self.counters.success_count += 1;
                None
            }
            BreakerState::HalfOpen => {
                self.counters.success_count += 1;
                if self.counters.success_count >= settings.half_open_requests {
                    self.counters.reset();
                    Some(self.transition(BreakerState::Closed))
                } else {
                    None
                }
            }
            // Late result from a call admitted before the breaker opened.
            BreakerState::Open => None,
        }
    }

    fn record_failure(
        &mut self,
        now: Instant,
        settings: &BreakerSettings,
    ) -> Option<(BreakerState, BreakerState)> {
        match self.state {
            BreakerState::Closed => {
                self.counters.failure_count += 1;
                self.counters.last_failure = Some(now);
                let total = self.counters.total();
                let ratio = f64::from(self.counters.failure_count) / f64::from(total);
                if total >= settings.request_volume_threshold && ratio > settings.failure_threshold
                {
                    Some(self.transition(BreakerState::Open))
                } else {
                    None
                }
            }
            BreakerState::HalfOpen => {
                self.counters.failure_count += 1;
                if self.counters.failure_count >= settings.half_open_requests {
                    self.counters.last_failure = Some(now);
                    Some(self.transition(BreakerState::Open))
                } else {
                    None
                }
            }
            BreakerState::Open => None,
        }
    }
}

/// Circuit breaker protecting a single dependency.
///
/// The operation is supplied per call, since its parameters vary per request;
/// state, thresholds and fallback belong to the dependency.
pub struct CircuitBreaker<T> {
    dependency: Dependency,
    settings: BreakerSettings,
    fallback: Fallback<T>,
    core: Mutex<Core>,
}

impl<T> CircuitBreaker<T> {
    pub fn new<F>(dependency: Dependency, settings: BreakerSettings, fallback: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            dependency,
            settings,
            fallback: Arc::new(fallback),
            core: Mutex::new(Core::new()),
        }
    }

    pub fn dependency(&self) -> Dependency {
        self.dependency
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let core = self.lock();
        BreakerSnapshot {
            state: core.state,
            success_count: core.counters.success_count,
            failure_count: core.counters.failure_count,
            times_opened: core.times_opened,
        }
    }

    /// Run `operation` through the breaker.
    ///
    /// Returns [`Fired::Live`] with the operation's value, or
    /// [`Fired::Fallback`] when the breaker is open or the operation failed.
    /// The lock is released while the operation runs; the check before and
    /// the record after are each applied atomically.
    pub async fn fire<F, Fut, E>(&self, operation: F) -> Fired<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let (admission, change) = {
            let mut core = self.lock();
            core.admit(Instant::now(), &self.settings)
        };
        self.log_transition(change);

        if let Admission::ShortCircuit = admission {
            debug!(dependency = %self.dependency, "Breaker open, returning fallback");
            return Fired::Fallback((self.fallback)());
        }

        match operation().await {
            Ok(value) => {
                let change = self.lock().record_success(&self.settings);
                self.log_transition(change);
                Fired::Live(value)
            }
            Err(e) => {
                warn!(dependency = %self.dependency, error = %e, "Protected operation failed");
                let change = {
                    let mut core = self.lock();
                    let change = core.record_failure(Instant::now(), &self.settings);
                    debug!(
                        dependency = %self.dependency,
                        state = ?core.state,
                        failures = core.counters.failure_count,
                        successes = core.counters.success_count,
                        "Breaker counters"
                    );
                    change
                };
                self.log_transition(change);
                Fired::Fallback((self.fallback)())
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn log_transition(&self, change: Option<(BreakerState, BreakerState)>) {
        match change {
            Some((from, BreakerState::Open)) => {
                warn!(dependency = %self.dependency, from = ?from, to = "Open", "Circuit state changed")
            }
            Some((from, to)) => {
                info!(dependency = %self.dependency, from = ?from, to = ?to, "Circuit state changed")
            }
            None => {}
        }
    }
}
