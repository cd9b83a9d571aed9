//! Downstream invocation contract.
//!
//! Every remote call the orchestrators make goes through [`Downstream`]:
//! one attempt, no retry, no timeout. Timeouts belong to the caller.
//!
//! Implementations:
//! - [`HttpDownstream`]: reqwest GET against `{host, port}` per dependency
//! - [`Traced`]: wraps any downstream and logs one event per call
//! - `mock::ScriptedDownstream` (tests / `test-utils`): canned responses and call counts

mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
mod traced;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub use http::HttpDownstream;
pub use traced::Traced;

/// Result type for downstream invocations.
pub type Result<T> = std::result::Result<T, InvokeError>;

/// Logical downstream services the aggregator talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dependency {
    Flight,
    Hotel,
    Weather,
    Event,
}

impl Dependency {
    /// All dependencies, in a stable order.
    pub const ALL: [Dependency; 4] = [
        Dependency::Flight,
        Dependency::Hotel,
        Dependency::Weather,
        Dependency::Event,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dependency::Flight => "flight",
            Dependency::Hotel => "hotel",
            Dependency::Weather => "weather",
            Dependency::Event => "event",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad classification of an invocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Remote call failed (transport, HTTP status, bad body). Degradable.
    Gateway,
    /// Unexpected local fault. Not recoverable by the aggregator.
    Internal,
}

/// Errors produced by a single downstream invocation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvokeError {
    #[error("downstream {dependency} failed: {message}")]
    Gateway {
        dependency: Dependency,
        message: String,
    },

    #[error("internal error calling {dependency}: {message}")]
    Internal {
        dependency: Dependency,
        message: String,
    },
}

impl InvokeError {
    pub fn gateway(dependency: Dependency, message: impl Into<String>) -> Self {
        InvokeError::Gateway {
            dependency,
            message: message.into(),
        }
    }

    pub fn internal(dependency: Dependency, message: impl Into<String>) -> Self {
        InvokeError::Internal {
            dependency,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            InvokeError::Gateway { .. } => FailureKind::Gateway,
            InvokeError::Internal { .. } => FailureKind::Internal,
        }
    }

    pub fn dependency(&self) -> Dependency {
        match self {
            InvokeError::Gateway { dependency, .. } | InvokeError::Internal { dependency, .. } => {
                *dependency
            }
        }
    }

    /// Returns true if callers may absorb this failure into a degraded result.
    pub fn is_gateway(&self) -> bool {
        self.kind() == FailureKind::Gateway
    }
}

/// Description of one remote call.
///
/// Built once by the orchestrator that issues it and never mutated after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    dependency: Dependency,
    path: String,
    segments: Vec<String>,
    params: BTreeMap<String, String>,
}

impl Invocation {
    /// Start an invocation against `path` on the given dependency.
    pub fn new(dependency: Dependency, path: impl Into<String>) -> Self {
        Self {
            dependency,
            path: path.into(),
            segments: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    /// Append a path segment. Segments are percent-encoded by the transport.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Add a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn dependency(&self) -> Dependency {
        self.dependency
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Path plus raw, unencoded segments, without host or query. For logs.
    pub fn display_path(&self) -> String {
        let mut path = self.path.trim_end_matches('/').to_string();
        for segment in &self.segments {
            path.push('/');
            path.push_str(segment);
        }
        path
    }
}

/// Interface for calling a downstream service.
#[async_trait]
pub trait Downstream: Send + Sync {
    /// Perform one remote call and decode its JSON body.
    async fn invoke(&self, invocation: &Invocation) -> Result<Value>;
}

#[async_trait]
impl<T: Downstream + ?Sized> Downstream for std::sync::Arc<T> {
    async fn invoke(&self, invocation: &Invocation) -> Result<Value> {
        (**self).invoke(invocation).await
    }
}
