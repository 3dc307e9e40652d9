/**
 * Relationship Extractor Module (C9)
 *
 * PATTERN: spec §4.9 is authoritative for this split (the Python original
 * folded relationship discovery into entity recognition; original_source
 * has no standalone relationship-extraction file to ground this on, so the
 * module boundary here is a Rust-native decision per SPEC_FULL.md).
 */

pub mod ai;
pub mod extractor;
pub mod pattern;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use extractor::RelationshipExtractor;

use crate::entity::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    TrainedOn,
    EvaluatedOn,
    Outperforms,
    DevelopedBy,
    BasedOn,
    PartOf,
    Uses,
    Implements,
    ProposedBy,
    Cites,
    Unknown,
}

impl RelationType {
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_uppercase().replace(' ', "_").as_str() {
            "TRAINED_ON" => RelationType::TrainedOn,
            "EVALUATED_ON" => RelationType::EvaluatedOn,
            "OUTPERFORMS" => RelationType::Outperforms,
            "DEVELOPED_BY" => RelationType::DevelopedBy,
            "BASED_ON" => RelationType::BasedOn,
            "PART_OF" => RelationType::PartOf,
            "USES" => RelationType::Uses,
            "IMPLEMENTS" => RelationType::Implements,
            "PROPOSED_BY" => RelationType::ProposedBy,
            "CITES" => RelationType::Cites,
            _ => RelationType::Unknown,
        }
    }
}

pub type Metadata = std::collections::BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
    pub confidence: f64,
    pub span: Option<Span>,
    pub metadata: Metadata,
}

impl Relationship {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, relation_type: RelationType, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type,
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

/// Mirrors `entity::filter` (spec §4.9).
pub fn filter(relationships: &[Relationship], min_confidence: Option<f64>, types: Option<&[RelationType]>) -> Vec<Relationship> {
    relationships
        .iter()
        .filter(|r| min_confidence.map_or(true, |min| r.confidence >= min))
        .filter(|r| types.map_or(true, |ts| ts.contains(&r.relation_type)))
        .cloned()
        .collect()
}

/// Merge candidates by (source, target, type): keep the highest-confidence
/// candidate per triple, unioning metadata (spec §4.9, combined extractor).
pub fn merge_by_triple(relationships: Vec<Relationship>) -> Vec<Relationship> {
    use std::collections::HashMap;

    let mut winners: HashMap<(String, String, RelationType), Relationship> = HashMap::new();
    for candidate in relationships {
        let key = (candidate.source_id.clone(), candidate.target_id.clone(), candidate.relation_type);
        match winners.get_mut(&key) {
            None => {
                winners.insert(key, candidate);
            }
            Some(existing) => {
                let union_metadata: Metadata = existing
                    .metadata
                    .iter()
                    .chain(candidate.metadata.iter())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                if candidate.confidence > existing.confidence {
                    existing.source_id = candidate.source_id;
                    existing.target_id = candidate.target_id;
                    existing.relation_type = candidate.relation_type;
                    existing.confidence = candidate.confidence;
                    existing.span = candidate.span;
                }
                existing.metadata = union_metadata;
            }
        }
    }
    winners.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        let r = Relationship::new("a", "b", RelationType::Uses, 2.0);
        assert_eq!(r.confidence, 1.0);
    }

    #[test]
    fn unknown_label_coerces_to_unknown() {
        assert_eq!(RelationType::from_label("made up"), RelationType::Unknown);
        assert_eq!(RelationType::from_label("trained_on"), RelationType::TrainedOn);
    }

    #[test]
    fn merge_keeps_highest_confidence_per_triple() {
        let relationships = vec![
            Relationship::new("a", "b", RelationType::Uses, 0.6).with_metadata("src", "pattern"),
            Relationship::new("a", "b", RelationType::Uses, 0.9).with_metadata("src", "ai"),
        ];
        let merged = merge_by_triple(relationships);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].confidence, 0.9);
        assert!(merged[0].metadata.contains_key("src"));
    }
}
