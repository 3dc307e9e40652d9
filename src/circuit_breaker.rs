/**
 * Circuit Breaker Module
 *
 * DESIGN DECISION: counters/state behind a single Mutex, wrapped call
 * executed outside the lock.
 * WHY: spec §5 requires the wrapped operation to run outside the breaker's
 * lock so a slow dependency doesn't serialize unrelated state reads.
 *
 * PATTERN: original_source/.../recovery/circuit_breaker.py (CLOSED/OPEN/
 * HALF_OPEN state machine, allowed_exceptions, global registry).
 */

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use crate::error::{Category, Error, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Configuration for a single named circuit (spec §3 CircuitState fields).
#[derive(Debug, Clone)]
pub struct CircuitConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_max_calls: u32,
    /// Categories that propagate without counting as a circuit failure.
    pub allowed_categories: Vec<Category>,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 1,
            allowed_categories: Vec::new(),
        }
    }
}

struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    half_open_calls: u32,
    last_failure_time: Option<Instant>,
}

/// A single named circuit breaker. Cheaply cloneable (internals are
/// `Arc`-free here; callers share breakers via the process-wide registry).
pub struct CircuitBreaker {
    name: String,
    config: CircuitConfig,
    inner: Mutex<Inner>,
}

/// Raised when a call is rejected because the circuit is OPEN.
#[derive(Debug, Clone)]
pub struct CircuitOpenError {
    pub name: String,
    pub recovery_remaining: Duration,
}

impl std::fmt::Display for CircuitOpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "circuit '{}' is OPEN, recovery in {:.1}s",
            self.name,
            self.recovery_remaining.as_secs_f64()
        )
    }
}

impl From<CircuitOpenError> for Error {
    fn from(e: CircuitOpenError) -> Error {
        Error::new(ErrorKind::CircuitOpen, e.to_string())
            .with_context("circuit", e.name)
    }
}

/// Outcome of requesting permission to call through the breaker.
enum Admission {
    Allowed,
    Rejected(CircuitOpenError),
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                half_open_calls: 0,
                last_failure_time: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().unwrap().failure_count
    }

    /// Force the breaker back to CLOSED, clearing counters.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.half_open_calls = 0;
        inner.last_failure_time = None;
    }

    fn admit(&self) -> Admission {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => Admission::Allowed,
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_time
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.config.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_calls = 1;
                    Admission::Allowed
                } else {
                    Admission::Rejected(CircuitOpenError {
                        name: self.name.clone(),
                        recovery_remaining: self.config.recovery_timeout - elapsed,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_calls < self.config.half_open_max_calls {
                    inner.half_open_calls += 1;
                    Admission::Allowed
                } else {
                    Admission::Rejected(CircuitOpenError {
                        name: self.name.clone(),
                        recovery_remaining: Duration::from_secs(0),
                    })
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.success_count += 1;
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            inner.failure_count = 0;
            inner.half_open_calls = 0;
        }
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failure_count += 1;
        inner.last_failure_time = Some(Instant::now());
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.half_open_calls = 0;
            }
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Run `f` through the breaker. The call itself executes outside the
    /// internal lock (spec §5); only the admission check and the outcome
    /// recording are serialized.
    pub fn call<T>(&self, f: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
        match self.admit() {
            Admission::Rejected(open) => Err(open.into()),
            Admission::Allowed => match f() {
                Ok(value) => {
                    self.record_success();
                    Ok(value)
                }
                Err(err) => {
                    if self.config.allowed_categories.contains(&err.category) {
                        // Propagates but is not counted as a circuit failure.
                    } else {
                        self.record_failure();
                    }
                    Err(err)
                }
            },
        }
    }
}

/// Process-wide registry mapping breaker name to shared breaker, so the
/// same logical dependency is protected by one breaker everywhere it's
/// called from (spec §4.3, §9).
static REGISTRY: OnceLock<Mutex<HashMap<String, &'static CircuitBreaker>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<String, &'static CircuitBreaker>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Get (or lazily create) the shared breaker for `name`. The config is only
/// used the first time a name is seen; later calls reuse the existing
/// breaker regardless of the config passed.
pub fn get_circuit_breaker(name: &str, config: CircuitConfig) -> &'static CircuitBreaker {
    let mut map = registry().lock().unwrap();
    if let Some(existing) = map.get(name) {
        return existing;
    }
    let boxed: &'static CircuitBreaker = Box::leak(Box::new(CircuitBreaker::new(name, config)));
    map.insert(name.to_string(), boxed);
    boxed
}
