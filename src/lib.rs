//! Trip aggregator - resilient orchestration over trip-planning services.
//!
//! Combines flight, hotel, weather and event lookups into one response
//! under a bounded time budget, degrading instead of failing when a
//! downstream service is slow or down.
//!
//! - [`invoker`]: uniform downstream call contract and HTTP transport
//! - [`breaker`]: per-dependency circuit breakers
//! - [`orchestration`]: scatter-gather, chain and branch entry points

pub mod breaker;
pub mod config;
pub mod invoker;
pub mod orchestration;
pub mod utils;
