/**
 * Recognizer trait and shared confidence heuristics (spec §4.8, §9).
 *
 * PATTERN: original_source/.../entity_recognition/base_recognizer.py
 * (confidence adjustment table); the trait is spec §9's "express as a
 * trait/interface `Recognizer { recognize(text) -> [Entity] }`".
 */

use crate::error::Error;

use super::{Entity, EntityType};

pub trait Recognizer: Send + Sync {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>, Error>;
}

const BASE_CONFIDENCE: f64 = 0.7;

/// Positive-context cues per entity type, scanned within a ±50-character
/// window of the match (spec §4.8 table).
pub fn positive_context_cue(entity_type: EntityType) -> Option<&'static [&'static str]> {
    match entity_type {
        EntityType::Model => Some(&["model", "trained", "architecture"]),
        EntityType::Dataset => Some(&["dataset", "corpus", "benchmark data"]),
        EntityType::Metric => Some(&["accuracy", "score", "achieved", "f1"]),
        EntityType::Framework | EntityType::Library => Some(&["using", "built with", "implemented in"]),
        EntityType::Finding => Some(&["found", "observed", "showed that"]),
        EntityType::Hypothesis => Some(&["hypothesize", "we propose", "we assume"]),
        _ => None,
    }
}

/// Scientific-discourse cues for the generic "+0.05" adjustment (spec §4.8).
const SCIENTIFIC_DISCOURSE_CUES: &[&str] = &["therefore", "in contrast", "furthermore", "consequently"];

fn context_window<'a>(text: &'a str, start: usize, end: usize, radius: usize) -> &'a str {
    let window_start = start.saturating_sub(radius);
    let window_end = (end + radius).min(text.len());
    // fall back to the whole text if the byte offsets don't land on a char
    // boundary rather than panicking on malformed callers' spans.
    match text.get(window_start..window_end) {
        Some(slice) => slice,
        None => text,
    }
}

/// Apply the additive confidence heuristics from spec §4.8 to a 0.7 base,
/// clamped to [0, 1].
pub fn heuristic_confidence(
    surface: &str,
    entity_type: EntityType,
    text: &str,
    start: usize,
    end: usize,
) -> f64 {
    let mut confidence = BASE_CONFIDENCE;

    if matches!(entity_type, EntityType::Model | EntityType::Framework)
        && surface.chars().next().is_some_and(|c| c.is_uppercase())
    {
        confidence += 0.1;
    }

    let near = context_window(text, start, end, 50).to_ascii_lowercase();
    if let Some(cues) = positive_context_cue(entity_type) {
        if cues.iter().any(|cue| near.contains(cue)) {
            confidence += 0.1;
        }
    }

    let len = surface.chars().count();
    if len < 3 {
        confidence -= 0.2;
    } else if len > 20 {
        if matches!(entity_type, EntityType::Finding | EntityType::Hypothesis) {
            confidence -= 0.1;
        } else {
            confidence -= 0.2;
        }
    }

    if entity_type == EntityType::Finding && surface.chars().any(|c| c.is_ascii_digit()) {
        confidence += 0.15;
    }

    if entity_type == EntityType::Hypothesis {
        let lower = surface.to_ascii_lowercase();
        if lower.contains("if") && lower.contains("then") {
            confidence += 0.1;
        }
    }

    let wide = context_window(text, start, end, 100).to_ascii_lowercase();
    if SCIENTIFIC_DISCOURSE_CUES.iter().any(|cue| wide.contains(cue)) {
        confidence += 0.05;
    }

    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_confidence_with_no_signals() {
        let text = "x zz something unrelated entirely";
        let confidence = heuristic_confidence("zz", EntityType::Concept, text, 2, 4);
        assert!((confidence - 0.5).abs() < 1e-9 || confidence < BASE_CONFIDENCE);
    }

    #[test]
    fn leading_uppercase_model_gets_bonus() {
        let text = "GPT-4 is a model.";
        let confidence = heuristic_confidence("GPT-4", EntityType::Model, text, 0, 5);
        assert!(confidence > BASE_CONFIDENCE);
    }

    #[test]
    fn very_short_surface_is_penalised() {
        let text = "ab cd ef";
        let confidence = heuristic_confidence("ab", EntityType::Concept, text, 0, 2);
        assert!(confidence < BASE_CONFIDENCE);
    }

    #[test]
    fn confidence_always_clamped() {
        let text = "a".repeat(40);
        let confidence = heuristic_confidence(&text, EntityType::Unknown, &text, 0, 40);
        assert!((0.0..=1.0).contains(&confidence));
    }
}
