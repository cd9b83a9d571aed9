//! Scatter-gather with the breaker-protected weather lookup.

use std::time::Duration;

use serde_json::json;

use trip_aggregator::breaker::BreakerState;
use trip_aggregator::invoker::mock::Behavior;
use trip_aggregator::invoker::Dependency;
use trip_aggregator::orchestration::{Aggregator, Part, TripQuery};

use crate::{flights, hotels, query, respond_core, setup};

fn forecast() -> serde_json::Value {
    json!({"summary": "sunny", "days": 7})
}

fn weather_state(aggregator: &Aggregator) -> BreakerState {
    aggregator
        .breakers()
        .get(Dependency::Weather)
        .unwrap()
        .state()
}

#[tokio::test(start_paused = true)]
async fn test_all_parts_live() {
    let (aggregator, mock) = setup();
    respond_core(&mock);
    mock.respond(Dependency::Weather, forecast());

    let result = aggregator
        .scatter_gather_with_weather(&query("GLL"))
        .await
        .unwrap();

    assert!(!result.degraded);
    assert_eq!(result.get(Part::Flights), Some(&flights()));
    assert_eq!(result.get(Part::Hotels), Some(&hotels()));
    assert_eq!(result.get(Part::Weather), Some(&forecast()));
}

#[tokio::test(start_paused = true)]
async fn test_weather_date_is_utc_calendar_date() {
    let (aggregator, mock) = setup();
    respond_core(&mock);
    mock.respond(Dependency::Weather, forecast());

    aggregator
        .scatter_gather_with_weather(&TripQuery::new("CMB", "GLL", "2025-06-01T02:00:00+05:30"))
        .await
        .unwrap();

    let weather = mock
        .invocations()
        .into_iter()
        .find(|inv| inv.dependency() == Dependency::Weather)
        .unwrap();
    assert_eq!(weather.display_path(), "/weather/seven-days/2025-05-31/GLL");
}

#[tokio::test(start_paused = true)]
async fn test_weather_failure_uses_fallback() {
    let (aggregator, mock) = setup();
    respond_core(&mock);
    mock.fail(Dependency::Weather);

    let result = aggregator
        .scatter_gather_with_weather(&query("GLL"))
        .await
        .unwrap();

    // The race finished in time; degradation comes from the breaker fallback.
    assert!(result.degraded);
    assert_eq!(result.get(Part::Flights), Some(&flights()));
    assert_eq!(
        result.get(Part::Weather),
        Some(&json!({"summary": "service unavailable", "degraded": true}))
    );
}

#[tokio::test(start_paused = true)]
async fn test_placeholders_after_timeout() {
    let (aggregator, mock) = setup();
    mock.hang(Dependency::Flight);
    mock.hang(Dependency::Hotel);
    mock.hang(Dependency::Weather);

    let result = aggregator
        .scatter_gather_with_weather(&query("GLL"))
        .await
        .unwrap();

    assert!(result.degraded);
    assert_eq!(result.get(Part::Flights), Some(&json!("no flights found")));
    assert_eq!(result.get(Part::Hotels), Some(&json!("no hotels found")));
    assert_eq!(
        result.get(Part::Weather),
        Some(&json!("no weather result found"))
    );
    assert_eq!(mock.calls(Dependency::Weather), 1);
}

#[tokio::test(start_paused = true)]
async fn test_breaker_opens_and_recovers_across_requests() {
    let (aggregator, mock) = setup();
    respond_core(&mock);
    for _ in 0..9 {
        mock.enqueue(Dependency::Weather, Behavior::Respond(forecast()));
    }
    mock.fail(Dependency::Weather);

    for _ in 0..20 {
        aggregator
            .scatter_gather_with_weather(&query("GLL"))
            .await
            .unwrap();
    }
    assert_eq!(weather_state(&aggregator), BreakerState::Open);
    assert_eq!(mock.calls(Dependency::Weather), 20);

    // Open and inside the cooldown: no weather call is made.
    mock.respond(Dependency::Weather, forecast());
    for _ in 0..3 {
        let result = aggregator
            .scatter_gather_with_weather(&query("GLL"))
            .await
            .unwrap();
        assert!(result.degraded);
        assert_eq!(result.get(Part::Weather).unwrap()["summary"], "service unavailable");
        assert_eq!(result.get(Part::Flights), Some(&flights()));
    }
    assert_eq!(mock.calls(Dependency::Weather), 20);

    tokio::time::advance(Duration::from_millis(30_001)).await;

    let result = aggregator
        .scatter_gather_with_weather(&query("GLL"))
        .await
        .unwrap();
    assert!(!result.degraded);
    assert_eq!(weather_state(&aggregator), BreakerState::HalfOpen);

    for _ in 0..4 {
        aggregator
            .scatter_gather_with_weather(&query("GLL"))
            .await
            .unwrap();
    }
    assert_eq!(weather_state(&aggregator), BreakerState::Closed);
    assert_eq!(mock.calls(Dependency::Weather), 25);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_failures_reopen() {
    let (aggregator, mock) = setup();
    respond_core(&mock);
    mock.fail(Dependency::Weather);

    for _ in 0..20 {
        aggregator
            .scatter_gather_with_weather(&query("GLL"))
            .await
            .unwrap();
    }
    assert_eq!(weather_state(&aggregator), BreakerState::Open);

    tokio::time::advance(Duration::from_millis(30_001)).await;
    for _ in 0..5 {
        aggregator
            .scatter_gather_with_weather(&query("GLL"))
            .await
            .unwrap();
    }

    assert_eq!(weather_state(&aggregator), BreakerState::Open);
    assert_eq!(mock.calls(Dependency::Weather), 25);
}

#[tokio::test(start_paused = true)]
async fn test_flight_and_hotel_not_protected() {
    let (aggregator, mock) = setup();
    respond_core(&mock);
    mock.fail(Dependency::Weather);

    for _ in 0..20 {
        aggregator
            .scatter_gather_with_weather(&query("GLL"))
            .await
            .unwrap();
    }

    // Flight and hotel are unprotected and keep being called.
    let result = aggregator.scatter_gather(&query("GLL")).await.unwrap();
    assert!(!result.degraded);
    assert_eq!(mock.calls(Dependency::Flight), 21);
}
