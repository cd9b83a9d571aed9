//! Branch orchestration: events only for coastal destinations.

use serde_json::json;

use trip_aggregator::invoker::Dependency;

use crate::{flights, hotels, query, respond_core, setup};

#[tokio::test]
async fn test_coastal_destination_fetches_events() {
    let (aggregator, mock) = setup();
    respond_core(&mock);
    mock.respond(Dependency::Event, json!([{"name": "Beach Festival"}]));

    let trip = aggregator.branch_contextual(&query("CMB")).await.unwrap();

    assert!(!trip.degraded);
    assert_eq!(trip.flight, Some(flights()));
    assert_eq!(trip.hotel, Some(hotels()));
    assert_eq!(trip.event, Some(json!([{"name": "Beach Festival"}])));
    assert_eq!(mock.calls(Dependency::Event), 1);

    let event = mock
        .invocations()
        .into_iter()
        .find(|inv| inv.dependency() == Dependency::Event)
        .unwrap();
    assert_eq!(event.param_value("location"), Some("CMB"));
    assert_eq!(event.param_value("category"), Some("coastal"));
}

#[tokio::test]
async fn test_inland_destination_skips_events() {
    let (aggregator, mock) = setup();
    respond_core(&mock);
    mock.respond(Dependency::Event, json!([{"name": "Perahera"}]));

    let trip = aggregator.branch_contextual(&query("KDY")).await.unwrap();

    assert!(!trip.degraded);
    assert_eq!(trip.event, None);
    assert_eq!(trip.flight, Some(flights()));
    assert_eq!(mock.calls(Dependency::Event), 0);
    assert_eq!(
        serde_json::to_value(&trip).unwrap()["event"],
        serde_json::Value::Null
    );
}

#[tokio::test]
async fn test_membership_is_case_sensitive() {
    let (aggregator, mock) = setup();
    respond_core(&mock);

    aggregator.branch_contextual(&query("cmb")).await.unwrap();

    assert_eq!(mock.calls(Dependency::Event), 0);
}

#[tokio::test]
async fn test_event_failure_degrades() {
    let (aggregator, mock) = setup();
    respond_core(&mock);
    mock.fail(Dependency::Event);

    let trip = aggregator.branch_contextual(&query("TRINC")).await.unwrap();

    assert!(trip.degraded);
    assert_eq!(trip.event, None);
    assert_eq!(trip.hotel, Some(hotels()));
}

#[tokio::test]
async fn test_flight_failure_degrades() {
    let (aggregator, mock) = setup();
    mock.fail(Dependency::Flight);
    mock.respond(Dependency::Hotel, hotels());

    let trip = aggregator.branch_contextual(&query("KDY")).await.unwrap();

    assert!(trip.degraded);
    assert_eq!(trip.flight, None);
    assert_eq!(trip.hotel, Some(hotels()));
}

#[tokio::test]
async fn test_configured_coastal_set() {
    let mut config = trip_aggregator::config::Config::for_test();
    config.branch.coastal_locations = vec!["KDY".to_string()];
    let (aggregator, mock) = crate::setup_with(config);
    respond_core(&mock);
    mock.respond(Dependency::Event, json!([]));

    aggregator.branch_contextual(&query("KDY")).await.unwrap();
    aggregator.branch_contextual(&query("CMB")).await.unwrap();

    assert_eq!(mock.calls(Dependency::Event), 1);
}
