/**
 * Retry Engine Module
 *
 * DESIGN DECISION: Strategy-driven delay computation decoupled from the
 * execute loop, so strategies are unit-testable without sleeping.
 * WHY: spec §4.2 defines five delay strategies (constant/linear/exponential/
 * fibonacci/random) plus optional jitter; keeping `delay_for` pure makes the
 * bound-check property (spec §8 property 8) trivial to assert.
 *
 * PATTERN: original_source/.../recovery/retry.py, translated to a
 * closure-based `execute` loop (no Python decorator equivalent needed).
 */

use std::time::{Duration, Instant};

use rand::Rng;

use crate::error::{Error, ErrorKind};

/// Delay strategy for successive retry attempts (spec §4.2 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    Constant,
    Linear,
    Exponential,
    Fibonacci,
    Random,
}

impl RetryStrategy {
    /// Un-jittered delay for 1-indexed attempt `n`, before the `max_delay`
    /// clamp. `base` and `max` are in milliseconds.
    fn raw_delay_ms(self, n: u32, base: u64, max: u64) -> u64 {
        match self {
            RetryStrategy::Constant => base,
            RetryStrategy::Linear => base.saturating_mul(n as u64),
            RetryStrategy::Exponential => base.saturating_mul(1u64 << (n.saturating_sub(1).min(62))),
            RetryStrategy::Fibonacci => base.saturating_mul(fibonacci(n)),
            RetryStrategy::Random => {
                if max <= base {
                    base
                } else {
                    rand::thread_rng().gen_range(base..=max)
                }
            }
        }
    }
}

fn fibonacci(n: u32) -> u64 {
    let (mut a, mut b) = (1u64, 1u64);
    for _ in 1..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    a
}

/// Policy configuring a `RetryEngine`. Mirrors spec §4.2's Policy fields;
/// `retryable_kinds`/`non_retryable_kinds` override an `ErrorKind`'s own
/// `retryable` flag when non-empty.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub strategy: RetryStrategy,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
    pub retryable_kinds: Vec<ErrorKind>,
    pub non_retryable_kinds: Vec<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            strategy: RetryStrategy::Exponential,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            jitter: false,
            retryable_kinds: Vec::new(),
            non_retryable_kinds: Vec::new(),
        }
    }
}

impl RetryPolicy {
    /// Whether an error should be retried under this policy. Default
    /// retryable categories are transient/resource/timeout (spec §4.2);
    /// explicit kind lists override that default.
    pub fn is_retryable(&self, err: &Error) -> bool {
        if self.non_retryable_kinds.contains(&err.kind) {
            return false;
        }
        if self.retryable_kinds.contains(&err.kind) {
            return true;
        }
        err.retryable
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let mut delay_ms = self
            .strategy
            .raw_delay_ms(attempt, base_ms, max_ms)
            .min(max_ms);
        if self.jitter {
            let jitter_cap = ((base_ms as f64) * 0.1) as u64;
            if jitter_cap > 0 {
                delay_ms += rand::thread_rng().gen_range(0..=jitter_cap);
            }
        }
        Duration::from_millis(delay_ms.min(max_ms))
    }
}

/// Outcome of a `RetryEngine::execute` call, regardless of whether the
/// wrapped function ultimately succeeded.
#[derive(Debug, Clone)]
pub struct RetryResult<T> {
    pub success: bool,
    pub value: Option<T>,
    pub error: Option<Error>,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Runs a fallible closure under a `RetryPolicy`, sleeping between attempts
/// per the policy's strategy. `on_retry` is invoked after each failed
/// attempt, before the delay, with (attempt, &error).
pub struct RetryEngine {
    policy: RetryPolicy,
}

impl RetryEngine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invariant: at most `policy.max_attempts` invocations of `f`.
    pub fn execute<T>(&self, mut f: impl FnMut(u32) -> Result<T, Error>) -> RetryResult<T> {
        self.execute_with_callback(&mut f, |_, _| {})
    }

    pub fn execute_with_callback<T>(
        &self,
        f: &mut impl FnMut(u32) -> Result<T, Error>,
        mut on_retry: impl FnMut(u32, &Error),
    ) -> RetryResult<T> {
        let start = Instant::now();
        let mut last_error = None;
        let mut attempts_made = 0;

        for attempt in 1..=self.policy.max_attempts {
            attempts_made = attempt;
            match f(attempt) {
                Ok(value) => {
                    return RetryResult {
                        success: true,
                        value: Some(value),
                        error: None,
                        attempts: attempt,
                        elapsed: start.elapsed(),
                    };
                }
                Err(err) => {
                    let retryable = self.policy.is_retryable(&err);
                    on_retry(attempt, &err);
                    last_error = Some(err);
                    if !retryable || attempt == self.policy.max_attempts {
                        break;
                    }
                    std::thread::sleep(self.policy.delay_for(attempt));
                }
            }
        }

        RetryResult {
            success: false,
            value: None,
            error: last_error,
            attempts: attempts_made,
            elapsed: start.elapsed(),
        }
    }
}

/// One retry attempt's outcome, for diagnostics. Mirrors the original's
/// `AttemptInfo` (attempt number, whether it succeeded, the error if any,
/// and the delay inserted before the next attempt).
#[derive(Debug, Clone)]
pub struct AttemptInfo {
    pub attempt: u32,
    pub succeeded: bool,
    pub error: Option<String>,
    pub delay_before_next: Option<Duration>,
}

/// Accumulates per-attempt diagnostics across a retry loop, matching the
/// original's `RetryContext.attempts: List[AttemptInfo]`. Built up by
/// `RetryEngine::execute_with_context` rather than a context manager, since
/// the closure-based `execute` already owns the loop.
#[derive(Debug, Default)]
pub struct RetryContext {
    pub attempts: Vec<AttemptInfo>,
}

impl RetryContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, attempt: u32, succeeded: bool, error: Option<&Error>, delay_before_next: Option<Duration>) {
        self.attempts.push(AttemptInfo {
            attempt,
            succeeded,
            error: error.map(|e| e.message.clone()),
            delay_before_next,
        });
    }
}

impl RetryEngine {
    /// Same as `execute`, but records an `AttemptInfo` per attempt into
    /// `ctx` for later inspection (e.g. surfacing a per-attempt timeline in
    /// a failure report).
    pub fn execute_with_context<T>(&self, mut f: impl FnMut(u32) -> Result<T, Error>, ctx: &mut RetryContext) -> RetryResult<T> {
        let start = Instant::now();
        let mut last_error = None;
        let mut attempts_made = 0;

        for attempt in 1..=self.policy.max_attempts {
            attempts_made = attempt;
            match f(attempt) {
                Ok(value) => {
                    ctx.record(attempt, true, None, None);
                    return RetryResult {
                        success: true,
                        value: Some(value),
                        error: None,
                        attempts: attempt,
                        elapsed: start.elapsed(),
                    };
                }
                Err(err) => {
                    let retryable = self.policy.is_retryable(&err);
                    let stop = !retryable || attempt == self.policy.max_attempts;
                    let delay = if stop { None } else { Some(self.policy.delay_for(attempt)) };
                    ctx.record(attempt, false, Some(&err), delay);
                    last_error = Some(err);
                    if stop {
                        break;
                    }
                    std::thread::sleep(delay.unwrap());
                }
            }
        }

        RetryResult {
            success: false,
            value: None,
            error: last_error,
            attempts: attempts_made,
            elapsed: start.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::cell::Cell;

    #[test]
    fn constant_strategy_is_flat() {
        let s = RetryStrategy::Constant;
        assert_eq!(s.raw_delay_ms(1, 100, 10_000), 100);
        assert_eq!(s.raw_delay_ms(5, 100, 10_000), 100);
    }

    #[test]
    fn exponential_strategy_doubles() {
        let s = RetryStrategy::Exponential;
        assert_eq!(s.raw_delay_ms(1, 10, 100_000), 10);
        assert_eq!(s.raw_delay_ms(2, 10, 100_000), 20);
        assert_eq!(s.raw_delay_ms(3, 10, 100_000), 40);
    }

    #[test]
    fn linear_strategy_scales_with_attempt() {
        let s = RetryStrategy::Linear;
        assert_eq!(s.raw_delay_ms(3, 10, 100_000), 30);
    }

    #[test]
    fn fibonacci_strategy_matches_sequence() {
        let s = RetryStrategy::Fibonacci;
        assert_eq!(s.raw_delay_ms(1, 1, 100_000), 1);
        assert_eq!(s.raw_delay_ms(2, 1, 100_000), 1);
        assert_eq!(s.raw_delay_ms(3, 1, 100_000), 2);
        assert_eq!(s.raw_delay_ms(4, 1, 100_000), 3);
        assert_eq!(s.raw_delay_ms(5, 1, 100_000), 5);
    }

    #[test]
    fn retry_bound_is_respected() {
        let calls = Cell::new(0u32);
        let engine = RetryEngine::new(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..Default::default()
        });
        let result: RetryResult<()> = engine.execute(|_attempt| {
            calls.set(calls.get() + 1);
            Err(Error::new(ErrorKind::UrlFetch, "always fails"))
        });
        assert_eq!(calls.get(), 3);
        assert_eq!(result.attempts, 3);
        assert!(!result.success);
    }

    #[test]
    fn non_retryable_aborts_immediately() {
        let calls = Cell::new(0u32);
        let engine = RetryEngine::new(RetryPolicy::default());
        let _: RetryResult<()> = engine.execute(|_attempt| {
            calls.set(calls.get() + 1);
            Err(Error::new(ErrorKind::DocumentRead, "permanent"))
        });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let attempt_count = Cell::new(0u32);
        let engine = RetryEngine::new(RetryPolicy {
            max_attempts: 3,
            strategy: RetryStrategy::Constant,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..Default::default()
        });
        let result = engine.execute(|attempt| {
            attempt_count.set(attempt);
            if attempt < 3 {
                Err(Error::new(ErrorKind::UrlFetch, "transient"))
            } else {
                Ok(42)
            }
        });
        assert!(result.success);
        assert_eq!(result.value, Some(42));
        assert_eq!(result.attempts, 3);
    }

    #[test]
    fn context_records_one_attempt_info_per_try() {
        let engine = RetryEngine::new(RetryPolicy {
            max_attempts: 3,
            strategy: RetryStrategy::Constant,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..Default::default()
        });
        let mut ctx = RetryContext::new();
        let attempt_count = Cell::new(0u32);
        let result = engine.execute_with_context(
            |attempt| {
                attempt_count.set(attempt);
                if attempt < 2 {
                    Err(Error::new(ErrorKind::UrlFetch, "transient"))
                } else {
                    Ok("done")
                }
            },
            &mut ctx,
        );

        assert!(result.success);
        assert_eq!(ctx.attempts.len(), 2);
        assert!(!ctx.attempts[0].succeeded);
        assert_eq!(ctx.attempts[0].error.as_deref(), Some("transient"));
        assert!(ctx.attempts[0].delay_before_next.is_some());
        assert!(ctx.attempts[1].succeeded);
        assert!(ctx.attempts[1].delay_before_next.is_none());
    }
}
