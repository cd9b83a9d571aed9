//! Downstream service endpoints.

use serde::Deserialize;

use crate::invoker::Dependency;

/// Host and port of one downstream service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL for HTTP calls.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Endpoint per dependency.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub flight: ServiceEndpoint,
    pub hotel: ServiceEndpoint,
    pub weather: ServiceEndpoint,
    pub event: ServiceEndpoint,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            flight: ServiceEndpoint::new("localhost", 3000),
            hotel: ServiceEndpoint::new("localhost", 4000),
            weather: ServiceEndpoint::new("localhost", 5010),
            event: ServiceEndpoint::new("localhost", 3010),
        }
    }
}

impl ServicesConfig {
    pub fn endpoint(&self, dependency: Dependency) -> &ServiceEndpoint {
        match dependency {
            Dependency::Flight => &self.flight,
            Dependency::Hotel => &self.hotel,
            Dependency::Weather => &self.weather,
            Dependency::Event => &self.event,
        }
    }
}
