/**
 * Progressive Extraction Module
 *
 * DESIGN DECISION: `ProgressiveExtractor` remembers the level that last
 * succeeded and starts there next time, rather than always starting at
 * FULL.
 * WHY: spec §4.6 — once a document source is known to only support, say,
 * BASIC extraction, retrying FULL/STANDARD on every subsequent call is
 * wasted work; "sticking" at the last-good level amortizes that discovery.
 *
 * PATTERN: original_source/.../recovery/fallback.py's ProgressiveExtractor.
 */

use crate::error::Error;
use crate::fallback::FallbackResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExtractionLevel {
    Full,
    Standard,
    Basic,
    Minimal,
}

impl ExtractionLevel {
    const ORDER: [ExtractionLevel; 4] = [
        ExtractionLevel::Full,
        ExtractionLevel::Standard,
        ExtractionLevel::Basic,
        ExtractionLevel::Minimal,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|l| *l == self).expect("ORDER is exhaustive")
    }

    /// Default quality for this level (spec §4.6: FULL 1.0, STANDARD 0.8,
    /// BASIC 0.5, MINIMAL 0.3).
    pub fn default_quality(self) -> f64 {
        match self {
            ExtractionLevel::Full => 1.0,
            ExtractionLevel::Standard => 0.8,
            ExtractionLevel::Basic => 0.5,
            ExtractionLevel::Minimal => 0.3,
        }
    }
}

/// Tries extraction at progressively lower fidelity levels, remembering
/// which level last worked so subsequent calls start there instead of at
/// FULL (spec §4.6 ProgressiveExtractor, supplemented by its `reset()` per
/// SPEC_FULL.md §4 so callers can force a fresh FULL attempt, e.g. after a
/// known transient outage clears).
pub struct ProgressiveExtractor {
    current_level: ExtractionLevel,
}

impl Default for ProgressiveExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressiveExtractor {
    pub fn new() -> Self {
        Self {
            current_level: ExtractionLevel::Full,
        }
    }

    pub fn current_level(&self) -> ExtractionLevel {
        self.current_level
    }

    /// Forces the next `process` call to start again at FULL.
    pub fn reset(&mut self) {
        self.current_level = ExtractionLevel::Full;
    }

    /// Tries `extractor` at `self.current_level`, then each remaining level
    /// in descending order, returning the first success. On success, updates
    /// `self.current_level` to the level that worked.
    pub fn process<T>(
        &mut self,
        content: &str,
        mut extractor: impl FnMut(ExtractionLevel, &str) -> Result<T, Error>,
    ) -> Result<FallbackResult<T>, Error> {
        let start = self.current_level.index();
        let mut last_error = None;

        for (offset, level) in ExtractionLevel::ORDER[start..].iter().enumerate() {
            match extractor(*level, content) {
                Ok(value) => {
                    self.current_level = *level;
                    return Ok(FallbackResult {
                        value,
                        from_fallback: offset > 0,
                        fallback_level: offset as u32,
                        quality: level.default_quality(),
                        original_error: last_error,
                        metadata: std::collections::BTreeMap::new(),
                    });
                }
                Err(err) => last_error = Some(err.kind),
            }
        }

        Err(last_error
            .map(|kind| Error::new(kind, "all extraction levels failed"))
            .unwrap_or_else(|| Error::new(crate::error::ErrorKind::EntityExtraction, "no extraction levels attempted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn succeeds_at_full_without_descending() {
        let mut extractor = ProgressiveExtractor::new();
        let result = extractor.process("text", |level, _| {
            assert_eq!(level, ExtractionLevel::Full);
            Ok(1)
        }).unwrap();
        assert!(!result.from_fallback);
        assert_eq!(extractor.current_level(), ExtractionLevel::Full);
    }

    #[test]
    fn descends_to_first_working_level_and_sticks() {
        let mut extractor = ProgressiveExtractor::new();
        let result = extractor
            .process("text", |level, _| match level {
                ExtractionLevel::Full | ExtractionLevel::Standard => {
                    Err(Error::new(ErrorKind::EntityExtraction, "too strict"))
                }
                ExtractionLevel::Basic => Ok(99),
                ExtractionLevel::Minimal => Ok(0),
            })
            .unwrap();
        assert!(result.from_fallback);
        assert_eq!(result.value, 99);
        assert_eq!(result.quality, 0.5);
        assert_eq!(extractor.current_level(), ExtractionLevel::Basic);

        // second call starts at Basic, not Full.
        let mut calls = Vec::new();
        let _ = extractor.process("text", |level, _| {
            calls.push(level);
            Ok(1)
        });
        assert_eq!(calls, vec![ExtractionLevel::Basic]);
    }

    #[test]
    fn reset_forces_full_again() {
        let mut extractor = ProgressiveExtractor::new();
        let _ = extractor.process("text", |level, _| match level {
            ExtractionLevel::Minimal => Ok(1),
            _ => Err(Error::new(ErrorKind::EntityExtraction, "fail")),
        });
        assert_eq!(extractor.current_level(), ExtractionLevel::Minimal);
        extractor.reset();
        assert_eq!(extractor.current_level(), ExtractionLevel::Full);
    }

    #[test]
    fn all_levels_failing_returns_error() {
        let mut extractor = ProgressiveExtractor::new();
        let result: Result<FallbackResult<i32>, Error> =
            extractor.process("text", |_, _| Err(Error::new(ErrorKind::EntityExtraction, "fail")));
        assert!(result.is_err());
    }
}
