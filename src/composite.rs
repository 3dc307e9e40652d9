/**
 * Composite Recognizer/Extractor (C10)
 *
 * DESIGN DECISION: fan out to sub-recognizers with `rayon`'s parallel
 * iterator, then resolve exact-span conflicts before handing off to
 * `entity::merge_overlapping` for the remaining partial overlaps.
 * WHY: spec §4.10's two-stage algorithm (exact-span grouping first,
 * general overlap second) maps directly onto "reduce, then merge".
 *
 * PATTERN: original_source/.../entity_recognition/combined_recognizer.py;
 * `rayon` chosen because the teacher already depends on it for parallel
 * fan-out over independent units of work (its codebase indexer).
 */

use std::collections::HashMap;

use rayon::prelude::*;

use crate::entity::{self, Entity, EntityType, Recognizer};
use crate::error::Error;
use crate::relationship::{self, extractor::RelationshipExtractor, Relationship};

/// Default type-priority map for exact-span conflict resolution
/// (spec §4.10 table); types absent from the map default to 10.
pub fn default_type_priority(entity_type: EntityType) -> i32 {
    match entity_type {
        EntityType::Model => 100,
        EntityType::Dataset => 90,
        EntityType::Algorithm => 85,
        EntityType::Metric => 80,
        EntityType::Architecture => 75,
        EntityType::Framework => 70,
        EntityType::Library => 65,
        EntityType::Theory => 60,
        EntityType::Concept => 55,
        EntityType::Methodology => 50,
        EntityType::Finding => 45,
        EntityType::Hypothesis => 40,
        EntityType::Author => 30,
        EntityType::Institution => 25,
        EntityType::Field => 20,
        EntityType::Unknown => 0,
        _ => 10,
    }
}

/// Resolve exact-span groups per spec §4.10 steps 1-3, leaving
/// non-exact overlaps for the caller's subsequent `merge_overlapping` pass.
fn resolve_exact_spans(candidates: Vec<Entity>, type_priority: &dyn Fn(EntityType) -> i32) -> Vec<Entity> {
    let mut groups: HashMap<(usize, usize), Vec<Entity>> = HashMap::new();
    let mut unspanned = Vec::new();

    for candidate in candidates {
        match candidate.span {
            Some(span) => groups.entry((span.start, span.end)).or_default().push(candidate),
            None => unspanned.push(candidate),
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (_, mut group) in groups {
        group.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| type_priority(b.entity_type).cmp(&type_priority(a.entity_type)))
        });
        let mut winner = group.remove(0);
        if !group.is_empty() {
            let alternative_types: Vec<String> = group.iter().map(|e| format!("{:?}", e.entity_type)).collect();
            winner = winner.with_metadata("alternative_types", alternative_types.join(","));
            for loser in group {
                for (k, v) in loser.metadata {
                    winner.metadata.entry(k).or_insert(v);
                }
            }
        }
        out.push(winner);
    }
    out.extend(unspanned);
    out
}

/// Runs every sub-recognizer over `text` in parallel and merges their
/// outputs with the exact-span-then-general-overlap resolution (spec
/// §4.10). Recognizers that error are logged and skipped — a composite's
/// job is graceful degradation, not all-or-nothing failure.
pub struct CompositeRecognizer {
    recognizers: Vec<Box<dyn Recognizer>>,
    type_priority: Box<dyn Fn(EntityType) -> i32 + Send + Sync>,
}

impl CompositeRecognizer {
    pub fn new(recognizers: Vec<Box<dyn Recognizer>>) -> Self {
        Self { recognizers, type_priority: Box::new(default_type_priority) }
    }

    pub fn with_type_priority(mut self, type_priority: impl Fn(EntityType) -> i32 + Send + Sync + 'static) -> Self {
        self.type_priority = Box::new(type_priority);
        self
    }
}

impl Recognizer for CompositeRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>, Error> {
        let candidates: Vec<Entity> = self
            .recognizers
            .par_iter()
            .flat_map(|recognizer| match recognizer.recognize(text) {
                Ok(entities) => entities,
                Err(err) => {
                    tracing::warn!(error = %err.message, "sub-recognizer failed, skipping");
                    Vec::new()
                }
            })
            .collect();

        let resolved = resolve_exact_spans(candidates, &self.type_priority);
        Ok(entity::merge_overlapping(&resolved))
    }
}

/// Composite over `RelationshipExtractor`s; merges by (source, target,
/// type) via `relationship::merge_by_triple` (spec §4.9's combined
/// extractor).
pub struct CompositeExtractor {
    extractors: Vec<Box<dyn RelationshipExtractor>>,
}

impl CompositeExtractor {
    pub fn new(extractors: Vec<Box<dyn RelationshipExtractor>>) -> Self {
        Self { extractors }
    }
}

impl RelationshipExtractor for CompositeExtractor {
    fn extract(&self, text: &str, entities: &[Entity]) -> Result<Vec<Relationship>, Error> {
        let candidates: Vec<Relationship> = self
            .extractors
            .par_iter()
            .flat_map(|extractor| match extractor.extract(text, entities) {
                Ok(relationships) => relationships,
                Err(err) => {
                    tracing::warn!(error = %err.message, "sub-extractor failed, skipping");
                    Vec::new()
                }
            })
            .collect();
        Ok(relationship::merge_by_triple(candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Span;

    struct FixedRecognizer(Vec<Entity>);
    impl Recognizer for FixedRecognizer {
        fn recognize(&self, _text: &str) -> Result<Vec<Entity>, Error> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn exact_span_conflict_keeps_higher_priority_type() {
        let span = Span::new(0, 5);
        let a = Entity::new("GPT-4", EntityType::Model, 0.8).with_span(span);
        let b = Entity::new("GPT-4", EntityType::Concept, 0.8).with_span(span);
        let composite = CompositeRecognizer::new(vec![
            Box::new(FixedRecognizer(vec![a])),
            Box::new(FixedRecognizer(vec![b])),
        ]);
        let result = composite.recognize("GPT-4").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].entity_type, EntityType::Model);
        assert!(result[0].metadata.contains_key("alternative_types"));
    }

    #[test]
    fn non_overlapping_candidates_all_pass_through() {
        let a = Entity::new("GPT-4", EntityType::Model, 0.8).with_span(Span::new(0, 5));
        let b = Entity::new("PyTorch", EntityType::Framework, 0.8).with_span(Span::new(10, 17));
        let composite = CompositeRecognizer::new(vec![Box::new(FixedRecognizer(vec![a, b]))]);
        let result = composite.recognize("irrelevant").unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn failing_sub_recognizer_is_skipped_not_fatal() {
        struct Failing;
        impl Recognizer for Failing {
            fn recognize(&self, _text: &str) -> Result<Vec<Entity>, Error> {
                Err(Error::new(crate::error::ErrorKind::EntityExtraction, "boom"))
            }
        }
        let good = Entity::new("BERT", EntityType::Model, 0.9).with_span(Span::new(0, 4));
        let composite = CompositeRecognizer::new(vec![Box::new(Failing), Box::new(FixedRecognizer(vec![good]))]);
        let result = composite.recognize("BERT").unwrap();
        assert_eq!(result.len(), 1);
    }
}
