//! Invocations issued by the entry points.

use crate::invoker::{Dependency, Invocation};

use super::query::Trip;

pub fn flight_search(trip: &Trip) -> Invocation {
    with_route(Invocation::new(Dependency::Flight, "/flight"), trip)
}

pub fn cheapest_flight(trip: &Trip) -> Invocation {
    with_route(Invocation::new(Dependency::Flight, "/flight/getCheapFlight"), trip)
}

pub fn hotels(location: &str) -> Invocation {
    Invocation::new(Dependency::Hotel, "/hotel").param("location", location)
}

pub fn weather(date: &str, location: &str) -> Invocation {
    Invocation::new(Dependency::Weather, "/weather/seven-days")
        .segment(date)
        .segment(location)
}

pub fn coastal_events(location: &str) -> Invocation {
    Invocation::new(Dependency::Event, "/event")
        .param("location", location)
        .param("category", "coastal")
}

fn with_route(invocation: Invocation, trip: &Trip) -> Invocation {
    invocation
        .param("startDestination", &trip.start)
        .param("endDestination", &trip.end)
        .param("departTime", &trip.depart_time)
}
