//! Integration tests for the orchestration entry points.
//!
//! Each test drives an `Aggregator` over a `ScriptedDownstream`, so call
//! counts and timings are fully controlled.

mod branch_test;
mod scatter_test;
mod weather_test;

use std::sync::Arc;

use serde_json::{json, Value};

use trip_aggregator::config::Config;
use trip_aggregator::invoker::mock::ScriptedDownstream;
use trip_aggregator::invoker::Dependency;
use trip_aggregator::orchestration::{Aggregator, TripQuery};

/// Aggregator with default settings over a fresh scripted downstream.
pub fn setup() -> (Aggregator, Arc<ScriptedDownstream>) {
    setup_with(Config::for_test())
}

pub fn setup_with(config: Config) -> (Aggregator, Arc<ScriptedDownstream>) {
    let mock = Arc::new(ScriptedDownstream::new());
    let aggregator = Aggregator::from_config(&config, mock.clone());
    (aggregator, mock)
}

pub fn query(end: &str) -> TripQuery {
    TripQuery::new("CMB", end, "2025-06-01T08:30:00Z")
}

pub fn flights() -> Value {
    json!([{"id": "UL-225", "price": 180}])
}

pub fn hotels() -> Value {
    json!([{"name": "Jetwing Lagoon", "checkInEndTime": "22:00"}])
}

/// Flight and hotel services answering immediately.
pub fn respond_core(mock: &ScriptedDownstream) {
    mock.respond(Dependency::Flight, flights());
    mock.respond(Dependency::Hotel, hotels());
}
