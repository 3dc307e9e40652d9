/**
 * Scientific recognizer: pattern recognition plus citation augmentation
 * (spec §4.8 — "(Author(s), YYYY)" -> AUTHOR + FINDING for the preceding
 * sentence).
 *
 * PATTERN: original_source/.../entity_recognition/scientific_recognizer.py.
 */

use std::sync::OnceLock;

use regex::Regex;

use crate::error::Error;

use super::pattern::PatternRecognizer;
use super::recognizer::Recognizer;
use super::{Entity, EntityType, Span};

fn citation_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\(([A-Z][\w.&'-]*(?:\s+(?:et al\.|and|&)\s+[A-Z][\w.&'-]*)*),?\s+(\d{4})\)")
            .expect("static pattern")
    })
}

/// Terminology loaded from a `terminology-path` config option (spec §6),
/// used only to seed extra pattern-set entries; citation detection itself
/// needs no external data.
pub struct ScientificRecognizer {
    base: PatternRecognizer,
}

impl ScientificRecognizer {
    pub fn new() -> Result<Self, Error> {
        Ok(Self { base: PatternRecognizer::new()? })
    }

    pub fn with_patterns(patterns: Vec<(EntityType, Vec<String>)>) -> Result<Self, Error> {
        Ok(Self { base: PatternRecognizer::with_patterns(patterns)? })
    }

    fn preceding_sentence(text: &str, citation_start: usize) -> Option<&str> {
        let before = &text[..citation_start];
        let sentence_start = before
            .rfind(['.', '!', '?'])
            .map(|i| i + 1)
            .unwrap_or(0);
        let sentence = before[sentence_start..].trim();
        if sentence.is_empty() {
            None
        } else {
            Some(sentence)
        }
    }
}

impl Recognizer for ScientificRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>, Error> {
        let mut out = self.base.recognize(text)?;

        for cap in citation_pattern().captures_iter(text) {
            let whole = cap.get(0).unwrap();
            let authors = cap.get(1).unwrap();
            out.push(
                Entity::new(authors.as_str(), EntityType::Author, 0.8)
                    .with_span(Span::new(authors.start(), authors.end()))
                    .with_metadata("year", cap.get(2).unwrap().as_str()),
            );

            if let Some(sentence) = Self::preceding_sentence(text, whole.start()) {
                out.push(
                    Entity::new(sentence, EntityType::Finding, 0.65)
                        .with_metadata("citation", whole.as_str()),
                );
            }
        }

        Ok(out)
    }
}
