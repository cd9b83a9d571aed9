//! Orchestration patterns over the downstream services.
//!
//! [`Aggregator`] exposes the four entry points used by the web layer:
//!
//! | Entry point                   | Pattern                           |
//! |-------------------------------|-----------------------------------|
//! | `scatter_gather`              | scatter-gather (flights, hotels)  |
//! | `scatter_gather_with_weather` | scatter-gather + weather breaker  |
//! | `chain_budget_route`          | chain (late check-in annotation)  |
//! | `branch_contextual`           | branch (coastal events)           |
//!
//! Every entry point validates its query before dispatching anything. Gateway
//! failures are absorbed into placeholders with `degraded = true`; only
//! internal faults surface as errors.

mod branch;
mod chain;
mod query;
mod requests;
mod result;
mod scatter;

use std::future::Future;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::breaker::{BreakerRegistry, BreakerSettings};
use crate::config::Config;
use crate::invoker::{Dependency, Downstream, Invocation, InvokeError};

pub use branch::CoastalLocations;
pub use chain::annotate as annotate_late_check_in;
pub use query::{calendar_date, clock_minutes, minutes_of_day, parse_instant, Trip, TripQuery};
pub use result::{AggregateResult, BudgetRoute, ContextualTrip, Part};
pub use scatter::{PartResult, PartValue, ScatterGather, TimeBudget};

/// Result type for orchestration entry points.
pub type Result<T> = std::result::Result<T, AggregatorError>;

/// Errors surfaced by the entry points.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    /// Missing or invalid request fields. Nothing was dispatched.
    #[error("invalid request: {0}")]
    ClientInput(String),

    /// Unexpected local fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<InvokeError> for AggregatorError {
    fn from(err: InvokeError) -> Self {
        AggregatorError::Internal(err.to_string())
    }
}

impl AggregatorError {
    pub fn is_client_input(&self) -> bool {
        matches!(self, AggregatorError::ClientInput(_))
    }
}

/// Summary returned when the weather breaker substitutes its fallback.
pub const WEATHER_UNAVAILABLE: &str = "service unavailable";

/// Fallback value of the weather breaker.
pub fn weather_fallback() -> Value {
    warn!("Weather service fallback executed");
    json!({ "summary": WEATHER_UNAVAILABLE, "degraded": true })
}

/// Build the registry of breakers for protected dependencies.
pub fn default_breakers(settings: &BreakerSettings) -> BreakerRegistry<Value> {
    BreakerRegistry::builder()
        .register(Dependency::Weather, settings.clone(), weather_fallback)
        .build()
}

/// Keep a successful value; absorb a gateway failure as `None` and mark degraded.
pub(crate) fn absorb(
    result: std::result::Result<Value, InvokeError>,
    degraded: &mut bool,
) -> Result<Option<Value>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_gateway() => {
            warn!(dependency = %e.dependency(), error = %e, "Downstream unavailable, degrading");
            *degraded = true;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// True when a downstream value flags itself as degraded.
fn carries_degraded_marker(value: &Value) -> bool {
    value.get("degraded").and_then(Value::as_bool) == Some(true)
}

/// Entry points over a shared downstream and breaker registry.
///
/// Cheap to share behind an `Arc`; the breaker registry is the only state
/// that outlives a request.
pub struct Aggregator {
    downstream: Arc<dyn Downstream>,
    breakers: Arc<BreakerRegistry<Value>>,
    budget: TimeBudget,
    coastal: CoastalLocations,
}

impl Aggregator {
    pub fn new(
        downstream: Arc<dyn Downstream>,
        breakers: Arc<BreakerRegistry<Value>>,
        budget: TimeBudget,
        coastal: CoastalLocations,
    ) -> Self {
        Self {
            downstream,
            breakers,
            budget,
            coastal,
        }
    }

    /// Build an aggregator with the breakers and settings from `config`.
    pub fn from_config(config: &Config, downstream: Arc<dyn Downstream>) -> Self {
        let breakers = Arc::new(default_breakers(&config.breakers.weather));
        let budget =
            TimeBudget::new(config.scatter.budget()).with_settle_grace(config.scatter.settle_grace());
        let coastal = CoastalLocations::new(config.branch.coastal_locations.iter().cloned());
        Self::new(downstream, breakers, budget, coastal)
    }

    pub fn breakers(&self) -> &BreakerRegistry<Value> {
        &self.breakers
    }

    pub fn budget(&self) -> TimeBudget {
        self.budget
    }

    /// Flights and hotels under the budget. Missing parts become `[]`.
    pub async fn scatter_gather(&self, query: &TripQuery) -> Result<AggregateResult> {
        let trip = query.validate()?;
        let span = info_span!("scatter_gather", request_id = %Uuid::new_v4());

        async {
            info!(start = %trip.start, end = %trip.end, depart_time = %trip.depart_time, "Fetching flight + hotel info");
            let result = ScatterGather::new()
                .part(Part::Flights, json!([]), self.call(requests::flight_search(&trip)))
                .part(Part::Hotels, json!([]), self.call(requests::hotels(&trip.end)))
                .gather(self.budget)
                .await?;
            info!(degraded = result.degraded, "Flight + hotel aggregated");
            Ok::<_, AggregatorError>(result)
        }
        .instrument(span)
        .await
    }

    /// Flights, hotels and breaker-protected weather under the budget.
    ///
    /// Requires a parseable departure time; the weather lookup uses its UTC date.
    pub async fn scatter_gather_with_weather(&self, query: &TripQuery) -> Result<AggregateResult> {
        let trip = query.validate()?;
        let departure = trip.departure()?;
        let span = info_span!("scatter_gather_with_weather", request_id = %Uuid::new_v4());

        async {
            let date = calendar_date(&departure);
            info!(start = %trip.start, end = %trip.end, date = %date, "Fetching flight, hotel, weather");

            let result = ScatterGather::new()
                .part(
                    Part::Flights,
                    json!("no flights found"),
                    self.call(requests::flight_search(&trip)),
                )
                .part(
                    Part::Hotels,
                    json!("no hotels found"),
                    self.call(requests::hotels(&trip.end)),
                )
                .part(
                    Part::Weather,
                    json!("no weather result found"),
                    self.protected_call(requests::weather(&date, &trip.end)),
                )
                .gather(self.budget)
                .await?;
            info!(degraded = result.degraded, "Flight + hotel + weather aggregated");
            Ok::<_, AggregatorError>(result)
        }
        .instrument(span)
        .await
    }

    /// Cheapest flight plus lodging annotated for late check-in.
    pub async fn chain_budget_route(&self, query: &TripQuery) -> Result<BudgetRoute> {
        let trip = query.validate()?;
        let span = info_span!("chain_budget_route", request_id = %Uuid::new_v4());

        async {
            info!(start = %trip.start, end = %trip.end, "Fetching budget route");
            chain::budget_route(self.downstream.as_ref(), &trip).await
        }
        .instrument(span)
        .await
    }

    /// Flight and lodging, plus local events for coastal destinations.
    pub async fn branch_contextual(&self, query: &TripQuery) -> Result<ContextualTrip> {
        let trip = query.validate()?;
        let span = info_span!("branch_contextual", request_id = %Uuid::new_v4());

        async {
            info!(start = %trip.start, end = %trip.end, "Fetching events + flight + hotel");
            branch::contextual(self.downstream.as_ref(), &self.coastal, &trip).await
        }
        .instrument(span)
        .await
    }

    /// Unprotected call, run as its own task by the scatter-gather.
    fn call(&self, invocation: Invocation) -> impl Future<Output = PartResult> + Send + 'static {
        let downstream = Arc::clone(&self.downstream);
        async move { downstream.invoke(&invocation).await.map(PartValue::live) }
            .in_current_span()
    }

    /// Call through the dependency's breaker, if one is registered.
    fn protected_call(
        &self,
        invocation: Invocation,
    ) -> impl Future<Output = PartResult> + Send + 'static {
        let downstream = Arc::clone(&self.downstream);
        let breaker = self.breakers.get(invocation.dependency());
        async move {
            let Some(breaker) = breaker else {
                return downstream.invoke(&invocation).await.map(|value| PartValue {
                    degraded: carries_degraded_marker(&value),
                    value,
                });
            };
            let fired = breaker.fire(|| downstream.invoke(&invocation)).await;
            let degraded = fired.is_fallback() || carries_degraded_marker(fired.value());
            Ok(PartValue {
                value: fired.into_inner(),
                degraded,
            })
        }
        .in_current_span()
    }
}
