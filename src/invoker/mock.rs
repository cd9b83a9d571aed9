//! Scripted downstream for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{Dependency, Downstream, Invocation, InvokeError, Result};

/// How a dependency answers a call.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Return the value immediately.
    Respond(Value),
    /// Return the value after a delay.
    Delay(Duration, Value),
    /// Fail with a gateway error.
    Fail,
    /// Fail with an internal error.
    FailInternal,
    /// Never complete.
    Hang,
}

#[derive(Default)]
struct State {
    defaults: HashMap<Dependency, Behavior>,
    queued: HashMap<Dependency, VecDeque<Behavior>>,
    invocations: Vec<Invocation>,
}

/// Mock downstream with per-dependency scripted behavior and call recording.
///
/// Queued behaviors are consumed first, one per call; after that the default
/// behavior for the dependency applies. Unscripted dependencies fail with a
/// gateway error.
#[derive(Default)]
pub struct ScriptedDownstream {
    state: Mutex<State>,
}

impl ScriptedDownstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default behavior for a dependency.
    pub fn set(&self, dependency: Dependency, behavior: Behavior) {
        self.lock().defaults.insert(dependency, behavior);
    }

    /// Queue a one-shot behavior, used before the default.
    pub fn enqueue(&self, dependency: Dependency, behavior: Behavior) {
        self.lock()
            .queued
            .entry(dependency)
            .or_default()
            .push_back(behavior);
    }

    pub fn respond(&self, dependency: Dependency, value: Value) {
        self.set(dependency, Behavior::Respond(value));
    }

    pub fn respond_after(&self, dependency: Dependency, delay: Duration, value: Value) {
        self.set(dependency, Behavior::Delay(delay, value));
    }

    pub fn fail(&self, dependency: Dependency) {
        self.set(dependency, Behavior::Fail);
    }

    pub fn hang(&self, dependency: Dependency) {
        self.set(dependency, Behavior::Hang);
    }

    /// Number of calls made to a dependency.
    pub fn calls(&self, dependency: Dependency) -> usize {
        self.lock()
            .invocations
            .iter()
            .filter(|inv| inv.dependency() == dependency)
            .count()
    }

    /// Number of calls made to any dependency.
    pub fn total_calls(&self) -> usize {
        self.lock().invocations.len()
    }

    /// Every invocation received, in call order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.lock().invocations.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_behavior(&self, invocation: &Invocation) -> Behavior {
        let mut state = self.lock();
        state.invocations.push(invocation.clone());
        let dependency = invocation.dependency();
        if let Some(behavior) = state
            .queued
            .get_mut(&dependency)
            .and_then(VecDeque::pop_front)
        {
            return behavior;
        }
        state
            .defaults
            .get(&dependency)
            .cloned()
            .unwrap_or(Behavior::Fail)
    }
}

#[async_trait]
impl Downstream for ScriptedDownstream {
    async fn invoke(&self, invocation: &Invocation) -> Result<Value> {
        let dependency = invocation.dependency();
        match self.next_behavior(invocation) {
            Behavior::Respond(value) => Ok(value),
            Behavior::Delay(delay, value) => {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            Behavior::Fail => Err(InvokeError::gateway(dependency, "mock gateway failure")),
            Behavior::FailInternal => {
                Err(InvokeError::internal(dependency, "mock internal failure"))
            }
            Behavior::Hang => std::future::pending().await,
        }
    }
}
