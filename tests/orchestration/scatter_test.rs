//! Scatter-gather over flights and hotels.

use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;

use trip_aggregator::invoker::mock::Behavior;
use trip_aggregator::invoker::Dependency;
use trip_aggregator::orchestration::{AggregatorError, Part};

use crate::{flights, hotels, query, respond_core, setup};

#[tokio::test(start_paused = true)]
async fn test_all_parts_in_budget() {
    let (aggregator, mock) = setup();
    respond_core(&mock);

    let result = aggregator.scatter_gather(&query("JFN")).await.unwrap();

    assert!(!result.degraded);
    assert_eq!(result.get(Part::Flights), Some(&flights()));
    assert_eq!(result.get(Part::Hotels), Some(&hotels()));
    assert_eq!(result.get(Part::Weather), None);
}

#[tokio::test(start_paused = true)]
async fn test_invocations_carry_query() {
    let (aggregator, mock) = setup();
    respond_core(&mock);

    aggregator.scatter_gather(&query("JFN")).await.unwrap();

    let invocations = mock.invocations();
    let flight = invocations
        .iter()
        .find(|inv| inv.dependency() == Dependency::Flight)
        .unwrap();
    let hotel = invocations
        .iter()
        .find(|inv| inv.dependency() == Dependency::Hotel)
        .unwrap();
    assert_eq!(flight.path(), "/flight");
    assert_eq!(flight.param_value("startDestination"), Some("CMB"));
    assert_eq!(flight.param_value("endDestination"), Some("JFN"));
    assert_eq!(flight.param_value("departTime"), Some("2025-06-01T08:30:00Z"));
    assert_eq!(hotel.param_value("location"), Some("JFN"));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_dependencies_return_at_budget() {
    let (aggregator, mock) = setup();
    mock.hang(Dependency::Flight);
    mock.hang(Dependency::Hotel);
    let start = Instant::now();

    let result = aggregator.scatter_gather(&query("JFN")).await.unwrap();

    assert!(start.elapsed() <= Duration::from_millis(1001));
    assert!(result.degraded);
    assert_eq!(result.get(Part::Flights), Some(&json!([])));
    assert_eq!(result.get(Part::Hotels), Some(&json!([])));
    assert_eq!(mock.calls(Dependency::Flight), 1);
    assert_eq!(mock.calls(Dependency::Hotel), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_part_is_not_reissued() {
    let (aggregator, mock) = setup();
    mock.respond(Dependency::Flight, flights());
    mock.respond_after(Dependency::Hotel, Duration::from_millis(1500), hotels());

    let result = aggregator.scatter_gather(&query("JFN")).await.unwrap();

    assert!(result.degraded);
    assert_eq!(result.get(Part::Flights), Some(&flights()));
    assert_eq!(result.get(Part::Hotels), Some(&json!([])));
    assert_eq!(mock.calls(Dependency::Hotel), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_part_delivered_within_grace() {
    let mut config = trip_aggregator::config::Config::for_test();
    config.scatter.settle_grace_ms = 1000;
    let (aggregator, mock) = crate::setup_with(config);
    mock.respond(Dependency::Flight, flights());
    mock.respond_after(Dependency::Hotel, Duration::from_millis(1500), hotels());

    let result = aggregator.scatter_gather(&query("JFN")).await.unwrap();

    // Budget was exceeded, so the result stays degraded even though it is complete.
    assert!(result.degraded);
    assert_eq!(result.get(Part::Hotels), Some(&hotels()));
    assert_eq!(mock.calls(Dependency::Hotel), 1);
}

#[tokio::test(start_paused = true)]
async fn test_gateway_failure_degrades() {
    let (aggregator, mock) = setup();
    mock.fail(Dependency::Flight);
    mock.respond(Dependency::Hotel, hotels());

    let result = aggregator.scatter_gather(&query("JFN")).await.unwrap();

    assert!(result.degraded);
    assert_eq!(result.get(Part::Flights), Some(&json!([])));
    assert_eq!(result.get(Part::Hotels), Some(&hotels()));
}

#[tokio::test(start_paused = true)]
async fn test_internal_failure_propagates() {
    let (aggregator, mock) = setup();
    mock.set(Dependency::Flight, Behavior::FailInternal);
    mock.respond(Dependency::Hotel, hotels());

    let err = aggregator.scatter_gather(&query("JFN")).await.unwrap_err();

    assert!(matches!(err, AggregatorError::Internal(_)));
}

#[tokio::test(start_paused = true)]
async fn test_serialized_shape() {
    let (aggregator, mock) = setup();
    mock.fail(Dependency::Flight);
    mock.fail(Dependency::Hotel);

    let result = aggregator.scatter_gather(&query("JFN")).await.unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"flights": [], "hotels": [], "degraded": true})
    );
}
