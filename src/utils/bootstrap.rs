//! Bootstrap utilities for the aggregator binary.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, LOG_ENV_VAR};
use crate::invoker::{HttpDownstream, Traced};
use crate::orchestration::Aggregator;

/// Initialize tracing with the AGGREGATOR_LOG environment variable.
///
/// Defaults to "info" level if AGGREGATOR_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wire an aggregator over HTTP downstreams, with one log event per call.
pub fn http_aggregator(config: &Config) -> Aggregator {
    let downstream = Traced::new(HttpDownstream::new(config.services.clone()));
    Aggregator::from_config(config, Arc::new(downstream))
}
