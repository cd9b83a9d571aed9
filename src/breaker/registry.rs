//! Breaker registry - one breaker per protected dependency.
//!
//! Built once at startup and shared by reference across requests, so every
//! call to a dependency observes and mutates the same state.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::{BreakerSettings, BreakerSnapshot, CircuitBreaker};
use crate::invoker::Dependency;

/// Immutable map of dependency -> breaker.
pub struct BreakerRegistry<T> {
    breakers: HashMap<Dependency, Arc<CircuitBreaker<T>>>,
}

impl<T> BreakerRegistry<T> {
    pub fn builder() -> BreakerRegistryBuilder<T> {
        BreakerRegistryBuilder {
            breakers: HashMap::new(),
        }
    }

    /// Registry with no protected dependencies.
    pub fn empty() -> Self {
        Self::builder().build()
    }

    /// Breaker protecting `dependency`, if one is registered.
    pub fn get(&self, dependency: Dependency) -> Option<Arc<CircuitBreaker<T>>> {
        self.breakers.get(&dependency).cloned()
    }

    pub fn contains(&self, dependency: Dependency) -> bool {
        self.breakers.contains_key(&dependency)
    }

    /// Protected dependencies, in a stable order.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut deps: Vec<_> = self.breakers.keys().copied().collect();
        deps.sort();
        deps
    }

    /// Current snapshot of every breaker.
    pub fn snapshots(&self) -> Vec<(Dependency, BreakerSnapshot)> {
        self.dependencies()
            .into_iter()
            .filter_map(|dep| self.breakers.get(&dep).map(|b| (dep, b.snapshot())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

/// Builder for [`BreakerRegistry`].
pub struct BreakerRegistryBuilder<T> {
    breakers: HashMap<Dependency, Arc<CircuitBreaker<T>>>,
}

impl<T> BreakerRegistryBuilder<T> {
    /// Register a breaker for a dependency. Registering twice replaces the earlier one.
    pub fn register<F>(mut self, dependency: Dependency, settings: BreakerSettings, fallback: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        info!(
            dependency = %dependency,
            failure_threshold = settings.failure_threshold,
            request_volume_threshold = settings.request_volume_threshold,
            cooldown_ms = settings.cooldown_ms,
            half_open_requests = settings.half_open_requests,
            "Registering circuit breaker"
        );
        self.breakers.insert(
            dependency,
            Arc::new(CircuitBreaker::new(dependency, settings, fallback)),
        );
        self
    }

    pub fn build(self) -> BreakerRegistry<T> {
        BreakerRegistry {
            breakers: self.breakers,
        }
    }
}
