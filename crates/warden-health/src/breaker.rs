//! Circuit breaker keyed by operation.
//!
//! After `max_failures` recorded failures the breaker opens and short-circuits
//! guarded calls. Once `cooldown` has passed since the last failure it closes
//! again on its own, without waiting for a trial call to succeed.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use warden_core::config::BreakerConfig;

use crate::error::BreakerError;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure: Option<Instant>,
    last_call: Option<Duration>,
}

/// Fault-tolerance guard around one operation.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    max_failures: u32,
    cooldown: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: &str, max_failures: u32, cooldown: Duration) -> Self {
        Self {
            name: name.to_string(),
            max_failures: max_failures.max(1),
            cooldown,
            state: Mutex::new(BreakerState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // State stays consistent across a panic in a caller; keep using it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether calls are currently being short-circuited.
    ///
    /// Observing an expired cooldown resets the breaker to closed.
    pub fn is_open(&self) -> bool {
        let mut state = self.lock();
        if state.failure_count < self.max_failures {
            return false;
        }
        match state.last_failure {
            Some(at) if at.elapsed() < self.cooldown => true,
            _ => {
                state.failure_count = 0;
                state.last_failure = None;
                info!(operation = %self.name, "circuit breaker closed after cooldown");
                false
            }
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure = Some(Instant::now());
        if state.failure_count == self.max_failures {
            warn!(
                operation = %self.name,
                failures = state.failure_count,
                cooldown_secs = self.cooldown.as_secs(),
                "circuit breaker opened"
            );
        }
    }

    pub fn record_success(&self) {
        self.reset();
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        state.failure_count = 0;
        state.last_failure = None;
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Duration of the most recent guarded call that actually ran.
    pub fn last_call_duration(&self) -> Option<Duration> {
        self.lock().last_call
    }

    /// Run `operation` unless the breaker is open.
    ///
    /// A short-circuited call returns [`BreakerError::Open`] and does not
    /// count as a failure.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.is_open() {
            debug!(operation = %self.name, "call short-circuited by open breaker");
            return Err(BreakerError::Open {
                operation: self.name.clone(),
            });
        }

        let started = Instant::now();
        let result = operation().await;
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        self.lock().last_call = Some(elapsed);
        debug!(
            operation = %self.name,
            elapsed_ms = elapsed.as_millis() as u64,
            ok = result.is_ok(),
            "guarded call finished"
        );

        result.map_err(BreakerError::Operation)
    }
}

/// One breaker per operation key, created on first use.
#[derive(Debug)]
pub struct BreakerRegistry {
    max_failures: u32,
    cooldown: Duration,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(max_failures: u32, cooldown: Duration) -> Self {
        Self {
            max_failures,
            cooldown,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &BreakerConfig) -> Self {
        Self::new(config.max_failures, config.cooldown())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<CircuitBreaker>>> {
        self.breakers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The breaker for `key`, creating it if needed.
    pub fn get(&self, key: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.lock();
        let breaker = breakers
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(key, self.max_failures, self.cooldown)));
        Arc::clone(breaker)
    }

    /// Keys whose breakers are currently open, sorted.
    pub fn open_keys(&self) -> Vec<String> {
        let breakers: Vec<Arc<CircuitBreaker>> = self.lock().values().cloned().collect();
        let mut open: Vec<String> = breakers
            .iter()
            .filter(|b| b.is_open())
            .map(|b| b.name().to_string())
            .collect();
        open.sort();
        open
    }
}
