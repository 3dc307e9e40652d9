/**
 * Entity Recognizer Module (C8)
 *
 * DESIGN DECISION: `EntityType` is a closed enum with an explicit
 * `Unknown` variant and a `from_str`-style coercion, rather than a newtype
 * string.
 * WHY: spec §3 — "type is one of the enumerated values (unknown strings
 * coerce to UNKNOWN)"; a closed enum makes the type-priority table in
 * C10 total instead of partial.
 *
 * PATTERN: original_source/.../entity_recognition/*.py (recognizer
 * strategies, confidence heuristics, merge_overlapping).
 */

pub mod ai;
pub mod dictionary;
pub mod pattern;
pub mod recognizer;
pub mod scientific;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use recognizer::Recognizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Model,
    Dataset,
    Algorithm,
    Metric,
    Architecture,
    Framework,
    Library,
    Benchmark,
    Concept,
    Theory,
    Methodology,
    Finding,
    Hypothesis,
    Author,
    Institution,
    Field,
    Limitation,
    Task,
    Unknown,
}

impl EntityType {
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "MODEL" => EntityType::Model,
            "DATASET" => EntityType::Dataset,
            "ALGORITHM" => EntityType::Algorithm,
            "METRIC" => EntityType::Metric,
            "ARCHITECTURE" => EntityType::Architecture,
            "FRAMEWORK" => EntityType::Framework,
            "LIBRARY" => EntityType::Library,
            "BENCHMARK" => EntityType::Benchmark,
            "CONCEPT" => EntityType::Concept,
            "THEORY" => EntityType::Theory,
            "METHODOLOGY" => EntityType::Methodology,
            "FINDING" => EntityType::Finding,
            "HYPOTHESIS" => EntityType::Hypothesis,
            "AUTHOR" => EntityType::Author,
            "INSTITUTION" => EntityType::Institution,
            "FIELD" => EntityType::Field,
            "LIMITATION" => EntityType::Limitation,
            "TASK" => EntityType::Task,
            _ => EntityType::Unknown,
        }
    }
}

/// Half-open `[start, end)` character span within a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must not exceed end");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

pub type Metadata = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub text: String,
    pub entity_type: EntityType,
    pub confidence: f64,
    pub span: Option<Span>,
    pub metadata: Metadata,
}

impl Entity {
    pub fn new(text: impl Into<String>, entity_type: EntityType, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            entity_type,
            confidence: confidence.clamp(0.0, 1.0),
            span: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Select entities by confidence threshold and/or type set (spec §4.8).
/// Monotone in `min_confidence`: a higher threshold never returns an entity
/// excluded at a lower one.
pub fn filter(entities: &[Entity], min_confidence: Option<f64>, types: Option<&[EntityType]>) -> Vec<Entity> {
    entities
        .iter()
        .filter(|e| min_confidence.map_or(true, |min| e.confidence >= min))
        .filter(|e| types.map_or(true, |ts| ts.contains(&e.entity_type)))
        .cloned()
        .collect()
}

/// Deduplicate overlapping spans per spec §4.8's accept/replace/drop rule.
/// Idempotent: running it again on its own output is a no-op, because the
/// output already has no two accepted entities sharing a character.
pub fn merge_overlapping(entities: &[Entity]) -> Vec<Entity> {
    let mut sorted: Vec<&Entity> = entities.iter().collect();
    sorted.sort_by(|a, b| {
        let a_start = a.span.map(|s| s.start).unwrap_or(0);
        let b_start = b.span.map(|s| s.start).unwrap_or(0);
        let a_len = a.span.map(|s| s.len()).unwrap_or(0);
        let b_len = b.span.map(|s| s.len()).unwrap_or(0);
        a_start.cmp(&b_start).then(b_len.cmp(&a_len))
    });

    let mut accepted: Vec<Entity> = Vec::new();
    let mut unspanned: Vec<Entity> = Vec::new();

    for candidate in sorted {
        let Some(candidate_span) = candidate.span else {
            unspanned.push(candidate.clone());
            continue;
        };

        let mut replace_index: Option<usize> = None;
        let mut dropped = false;

        for (i, existing) in accepted.iter().enumerate() {
            let Some(existing_span) = existing.span else { continue };
            if !candidate_span.overlaps(&existing_span) {
                continue;
            }
            if existing_span.contains(&candidate_span) {
                dropped = true;
                break;
            }
            if candidate_span.contains(&existing_span) {
                if candidate.confidence >= existing.confidence {
                    replace_index = Some(i);
                    break;
                } else {
                    dropped = true;
                    break;
                }
            }
            // Partial overlap, neither contains the other: keep higher
            // confidence; ties favour the earlier accepted entity.
            if candidate.confidence > existing.confidence {
                replace_index = Some(i);
            } else {
                dropped = true;
            }
            break;
        }

        if dropped {
            continue;
        }
        if let Some(i) = replace_index {
            accepted[i] = candidate.clone();
        } else {
            accepted.push(candidate.clone());
        }
    }

    accepted.extend(unspanned);
    accepted
}
