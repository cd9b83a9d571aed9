//! trip-aggregator: run one orchestration against the configured services
//!
//! Prints the composed response as JSON on stdout.
//!
//! ## Usage
//! ```text
//! trip-aggregator <search|search-weather|cheapest-route|contextual> <start> <end> <departTime>
//! ```
//!
//! ## Configuration
//! - AGGREGATOR_CONFIG: Path to a YAML config file (optional)
//! - AGGREGATOR__SCATTER__BUDGET_MS: Scatter-gather budget (default: 1000)
//! - AGGREGATOR_LOG: Log filter (default: info)

use std::process::ExitCode;

use tracing::error;

use trip_aggregator::config::Config;
use trip_aggregator::orchestration::{AggregatorError, TripQuery};
use trip_aggregator::utils::bootstrap::{http_aggregator, init_tracing};

const USAGE: &str =
    "usage: trip-aggregator <search|search-weather|cheapest-route|contextual> <start> <end> <departTime>";

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [pattern, start, end, depart_time] = args.as_slice() else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::from(2));
    };

    let config = Config::load(None)?;
    let aggregator = http_aggregator(&config);
    let query = TripQuery::new(start.as_str(), end.as_str(), depart_time.as_str());

    let result = match pattern.as_str() {
        "search" => aggregator
            .scatter_gather(&query)
            .await
            .map(serde_json::to_value),
        "search-weather" => aggregator
            .scatter_gather_with_weather(&query)
            .await
            .map(serde_json::to_value),
        "cheapest-route" => aggregator
            .chain_budget_route(&query)
            .await
            .map(serde_json::to_value),
        "contextual" => aggregator
            .branch_contextual(&query)
            .await
            .map(serde_json::to_value),
        other => {
            eprintln!("unknown pattern '{other}'\n{USAGE}");
            return Ok(ExitCode::from(2));
        }
    };

    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value?)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ AggregatorError::ClientInput(_)) => {
            eprintln!("{e}");
            Ok(ExitCode::from(2))
        }
        Err(e) => {
            error!(error = %e, "Aggregation failed");
            Ok(ExitCode::FAILURE)
        }
    }
}
