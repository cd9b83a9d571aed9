//! Composed responses returned by the entry points.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Logical part of a scatter-gather response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Part {
    Flights,
    Hotels,
    Weather,
    Events,
}

impl Part {
    pub fn as_str(&self) -> &'static str {
        match self {
            Part::Flights => "flights",
            Part::Hotels => "hotels",
            Part::Weather => "weather",
            Part::Events => "events",
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scatter-gather response: one value (live or placeholder) per part.
///
/// Serializes flat: `{"flights": ..., "hotels": ..., "degraded": false}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    #[serde(flatten)]
    pub parts: BTreeMap<Part, Value>,
    pub degraded: bool,
}

impl AggregateResult {
    pub fn get(&self, part: Part) -> Option<&Value> {
        self.parts.get(&part)
    }
}

/// Chain response: the cheapest flight and lodging annotated for late check-in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetRoute {
    pub flight: Option<Value>,
    pub hotel: Vec<Value>,
    pub degraded: bool,
}

/// Branch response: `event` is `None` when the destination has no events lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextualTrip {
    pub flight: Option<Value>,
    pub hotel: Option<Value>,
    pub event: Option<Value>,
    pub degraded: bool,
}
