//! Branch orchestration: flight and lodging always, local events only for
//! coastal destinations.

use std::collections::HashSet;

use tracing::info;

use super::query::Trip;
use super::result::ContextualTrip;
use super::{absorb, requests, Result};
use crate::invoker::Downstream;

/// Exact-match, case-sensitive set of destinations with an events lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoastalLocations {
    codes: HashSet<String>,
}

impl CoastalLocations {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, location: &str) -> bool {
        self.codes.contains(location)
    }
}

pub(super) async fn contextual(
    downstream: &dyn Downstream,
    coastal: &CoastalLocations,
    trip: &Trip,
) -> Result<ContextualTrip> {
    let flight_call = requests::flight_search(trip);
    let hotel_call = requests::hotels(&trip.end);
    let event_call = coastal
        .contains(&trip.end)
        .then(|| requests::coastal_events(&trip.end));

    if event_call.is_none() {
        info!(destination = %trip.end, "Non-coastal destination, skipping event fetch");
    }

    let (flight, hotel, event) = tokio::join!(
        downstream.invoke(&flight_call),
        downstream.invoke(&hotel_call),
        async {
            match &event_call {
                Some(call) => Some(downstream.invoke(call).await),
                None => None,
            }
        }
    );

    let mut degraded = false;
    let flight = absorb(flight, &mut degraded)?;
    let hotel = absorb(hotel, &mut degraded)?;
    let event = match event {
        Some(result) => absorb(result, &mut degraded)?,
        None => None,
    };

    Ok(ContextualTrip {
        flight,
        hotel,
        event,
        degraded,
    })
}
