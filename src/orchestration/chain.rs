//! Chain orchestration: budget route with late check-in annotation.
//!
//! The cheapest flight and the destination's lodging are fetched together;
//! each lodging is then annotated from the flight's arrival time.

use serde_json::Value;
use tracing::{debug, warn};

use super::query::{clock_minutes, minutes_of_day, Trip};
use super::result::BudgetRoute;
use super::{absorb, requests, Result};
use crate::invoker::Downstream;

/// Field on the flight result holding the arrival date-time.
const ARRIVE_TIME_FIELD: &str = "arriveTime";
/// Field on each lodging holding the latest check-in clock time.
const CHECK_IN_END_FIELD: &str = "checkInEndTime";
/// Annotation added to each lodging.
const LATE_CHECK_IN_FIELD: &str = "lateCheckIn";

pub(super) async fn budget_route(downstream: &dyn Downstream, trip: &Trip) -> Result<BudgetRoute> {
    let flight_call = requests::cheapest_flight(trip);
    let hotel_call = requests::hotels(&trip.end);

    let (flight, hotels) = tokio::join!(
        downstream.invoke(&flight_call),
        downstream.invoke(&hotel_call)
    );

    let mut degraded = false;
    let flight = absorb(flight, &mut degraded)?;
    let hotels = absorb(hotels, &mut degraded)?;

    let arrival = flight.as_ref().and_then(arrival_minutes);
    if arrival.is_none() {
        warn!("No usable arrival time, late check-in cannot be confirmed");
        degraded = true;
    }

    let hotel = match hotels {
        Some(Value::Array(lodgings)) => annotate(lodgings, arrival),
        _ => Vec::new(),
    };

    Ok(BudgetRoute {
        flight,
        hotel,
        degraded,
    })
}

fn arrival_minutes(flight: &Value) -> Option<u32> {
    flight
        .get(ARRIVE_TIME_FIELD)
        .and_then(Value::as_str)
        .and_then(minutes_of_day)
}

/// Add `lateCheckIn` to each lodging object.
///
/// Eligible when the arrival minute-of-day is at or before the lodging's
/// check-in cutoff. Without an arrival time or a readable cutoff the flag is
/// false. Entries that are not objects are dropped.
pub fn annotate(lodgings: Vec<Value>, arrival: Option<u32>) -> Vec<Value> {
    lodgings
        .into_iter()
        .filter_map(|lodging| match lodging {
            Value::Object(mut fields) => {
                let cutoff = fields
                    .get(CHECK_IN_END_FIELD)
                    .and_then(Value::as_str)
                    .and_then(clock_minutes);
                let eligible = matches!((arrival, cutoff), (Some(a), Some(c)) if a <= c);
                debug!(arrival = ?arrival, cutoff = ?cutoff, eligible, "Late check-in evaluated");
                fields.insert(LATE_CHECK_IN_FIELD.to_string(), Value::Bool(eligible));
                Some(Value::Object(fields))
            }
            other => {
                warn!(lodging = %other, "Skipping lodging entry that is not an object");
                None
            }
        })
        .collect()
}
