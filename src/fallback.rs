/**
 * Progressive Fallback Engine Module
 *
 * DESIGN DECISION: `FallbackStrategy<T>` holds `Box<dyn Fn() -> Result<T, Error>>`
 * for the primary and each fallback, rather than generic closures threaded
 * through the type signature.
 * WHY: the ordered fallback list is heterogeneous in source (primary query,
 * cache read, static default, …) but homogeneous in output type; boxing is
 * the natural way to store "try these, in order" without infecting callers
 * with a closure-type parameter per fallback.
 *
 * PATTERN: original_source/.../recovery/fallback.py (FallbackStrategy,
 * quality-annotated result, `max(0.1, 0.7**i)` default quality curve).
 */

use crate::circuit_breaker::CircuitBreaker;
use crate::error::{Error, ErrorKind};

/// A result annotated with how it was produced and how much to trust it
/// (spec §3 FallbackResult<T>).
#[derive(Debug, Clone)]
pub struct FallbackResult<T> {
    pub value: T,
    pub from_fallback: bool,
    pub fallback_level: u32,
    pub quality: f64,
    pub original_error: Option<ErrorKind>,
    pub metadata: std::collections::BTreeMap<String, String>,
}

fn default_quality(level: u32) -> f64 {
    if level == 0 {
        1.0
    } else {
        0.7f64.powi(level as i32).max(0.1)
    }
}

/// An ordered primary-plus-fallbacks chain (spec §4.6).
pub struct FallbackStrategy<T> {
    primary: Box<dyn Fn() -> Result<T, Error>>,
    fallbacks: Vec<Box<dyn Fn() -> Result<T, Error>>>,
    breaker: Option<&'static CircuitBreaker>,
    quality_estimates: Option<Vec<f64>>,
    error_handler: Option<Box<dyn Fn(&Error) -> Option<T>>>,
    wrap_result: bool,
}

impl<T> FallbackStrategy<T> {
    pub fn new(primary: impl Fn() -> Result<T, Error> + 'static) -> Self {
        Self {
            primary: Box::new(primary),
            fallbacks: Vec::new(),
            breaker: None,
            quality_estimates: None,
            error_handler: None,
            wrap_result: true,
        }
    }

    pub fn with_fallback(mut self, fallback: impl Fn() -> Result<T, Error> + 'static) -> Self {
        self.fallbacks.push(Box::new(fallback));
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: &'static CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn with_quality_estimates(mut self, estimates: Vec<f64>) -> Self {
        self.quality_estimates = Some(estimates);
        self
    }

    pub fn with_error_handler(mut self, handler: impl Fn(&Error) -> Option<T> + 'static) -> Self {
        self.error_handler = Some(Box::new(handler));
        self
    }

    pub fn with_wrap_result(mut self, wrap: bool) -> Self {
        self.wrap_result = wrap;
        self
    }

    fn quality_for(&self, level: u32) -> f64 {
        match &self.quality_estimates {
            Some(estimates) => estimates
                .get(level as usize)
                .copied()
                .unwrap_or_else(|| default_quality(level)),
            None => default_quality(level),
        }
    }

    fn wrap(&self, value: T, level: u32, from_fallback: bool, original_error: Option<ErrorKind>) -> FallbackResult<T> {
        FallbackResult {
            value,
            from_fallback,
            fallback_level: level,
            quality: self.quality_for(level),
            original_error,
            metadata: std::collections::BTreeMap::new(),
        }
    }

    /// Primary through its breaker, then each fallback in order, then the
    /// error handler as a last resort. Returns the raw `(value, level,
    /// from_fallback, original_error)` tuple shared by `execute` and
    /// `execute_value` so the ordering logic lives in one place.
    fn run(&self) -> Result<(T, u32, bool, Option<ErrorKind>), Error> {
        let primary_result = match self.breaker {
            Some(breaker) => breaker.call(|| (self.primary)()),
            None => (self.primary)(),
        };

        let primary_err = match primary_result {
            Ok(value) => return Ok((value, 0, false, None)),
            Err(err) => err,
        };

        for (i, fallback) in self.fallbacks.iter().enumerate() {
            if let Ok(value) = fallback() {
                let level = (i + 1) as u32;
                return Ok((value, level, true, Some(primary_err.kind)));
            }
        }

        if let Some(handler) = &self.error_handler {
            if let Some(value) = handler(&primary_err) {
                let level = (self.fallbacks.len() + 1) as u32;
                return Ok((value, level, true, Some(primary_err.kind)));
            }
        }

        Err(primary_err)
    }

    /// Run the chain per spec §4.6 and always return the full
    /// `FallbackResult<T>`. Rust's return type is fixed at compile time, so
    /// unlike the original's `wrap_result` flag this can't switch to
    /// returning a bare `T` at runtime — `execute_value` is the accessor
    /// for callers who built the strategy with `with_wrap_result(false)`
    /// and want the bare value without paying for quality/metadata
    /// bookkeeping.
    pub fn execute(&self) -> Result<FallbackResult<T>, Error> {
        let (value, level, from_fallback, original_error) = self.run()?;
        let mut result = self.wrap(value, level, from_fallback, original_error);
        let is_last_resort = from_fallback && level as usize == self.fallbacks.len() + 1;
        if is_last_resort {
            result.quality = result.quality.min(0.1);
        }
        Ok(result)
    }

    /// The `wrap_result` accessor: when the strategy was built with
    /// `with_wrap_result(false)` this skips `quality_for`/metadata
    /// construction entirely and returns the bare value. When
    /// `wrap_result` is left at its default (`true`) this is just
    /// `execute().map(|r| r.value)`.
    pub fn execute_value(&self) -> Result<T, Error> {
        if self.wrap_result {
            return self.execute().map(|r| r.value);
        }
        self.run().map(|(value, ..)| value)
    }
}
