/**
 * Knowledge Extraction Pipeline
 *
 * DESIGN DECISION: modular architecture with separate concerns for the
 * error taxonomy, resilience fabric (retry/circuit-breaker/checkpoint/
 * transaction/fallback), document processing, entity recognition,
 * relationship extraction, and graph projection.
 * WHY: each stage of the pipeline (document -> entities -> relationships
 * -> graph) has an independent failure mode and an independent test
 * surface; the resilience fabric is shared infrastructure the extraction
 * stages are wrapped in, not bolted onto any one of them.
 *
 * # Architecture Overview
 *
 * ```text
 * ┌──────────────────────────────────────────────────────────────┐
 * │                  Knowledge Extraction Pipeline                │
 * ├───────────────┬────────────────┬───────────────┬─────────────┤
 * │   Document     │    Entity       │ Relationship   │  Graph      │
 * │  (document/*)  │ (entity/*)      │ (relationship/*│ (graph.rs)  │
 * ├───────────────┴────────────────┴───────────────┴─────────────┤
 * │             Composite Recognizer/Extractor (composite.rs)      │
 * ├──────────────────────────────────────────────────────────────┤
 * │  Retry │ Circuit Breaker │ Fallback │ Checkpoint │ Transaction │
 * │(retry) │(circuit_breaker)│(fallback,│(checkpoint)│(transaction)│
 * │        │                 │progressive)            │            │
 * ├──────────────────────────────────────────────────────────────┤
 * │                   Error Taxonomy (error.rs)                    │
 * └──────────────────────────────────────────────────────────────┘
 * ```
 *
 * # Examples
 *
 * ```rust
 * use knowledge_extractor::{KnowledgeExtractor, KnowledgeExtractorOptions};
 * use knowledge_extractor::document::DocumentProcessor;
 * use knowledge_extractor::entity::pattern::PatternRecognizer;
 * use knowledge_extractor::relationship::pattern::PatternRelationshipExtractor;
 *
 * let extractor = KnowledgeExtractor::new(
 *     DocumentProcessor::new(),
 *     Box::new(PatternRecognizer::new().unwrap()),
 *     Box::new(PatternRelationshipExtractor::new()),
 *     KnowledgeExtractorOptions::default(),
 * );
 *
 * let summary = extractor.extract_from_text(
 *     "GPT-4 was trained on ImageNet.",
 *     "doc-1",
 * );
 * println!("entities: {}", summary.entity_count);
 * ```
 */

pub mod checkpoint;
pub mod circuit_breaker;
pub mod composite;
pub mod config;
pub mod document;
pub mod entity;
pub mod error;
pub mod fallback;
pub mod graph;
pub mod knowledge_extractor;
pub mod progressive;
pub mod relationship;
pub mod retry;
pub mod transaction;

// DESIGN DECISION: re-export primary types at crate root for ergonomic
// imports (use knowledge_extractor::Entity, not
// knowledge_extractor::entity::Entity).
pub use checkpoint::{Checkpoint, CheckpointStore, CheckpointedTask};
pub use circuit_breaker::{get_circuit_breaker, CircuitBreaker, CircuitConfig, CircuitOpenError, CircuitState};
pub use composite::{CompositeExtractor, CompositeRecognizer};
pub use config::Options as Config;
pub use document::{Document, DocumentProcessor, DocumentType, Segment, SegmentKind};
pub use entity::{Entity, EntityType, Recognizer, Span};
pub use error::{Category, Error, ErrorKind, Result, Severity};
pub use fallback::{FallbackResult, FallbackStrategy};
pub use graph::{Edge, KnowledgeGraph, Node};
pub use knowledge_extractor::{KnowledgeExtractor, KnowledgeExtractorOptions, Stats, Summary};
pub use progressive::{ExtractionLevel, ProgressiveExtractor};
pub use relationship::{extractor::RelationshipExtractor, RelationType, Relationship};
pub use retry::{AttemptInfo, RetryContext, RetryEngine, RetryPolicy, RetryResult, RetryStrategy};
pub use transaction::{with_transaction, Transaction};

pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// Returns the library version as a semantic version string.
///
/// # Examples
///
/// ```rust
/// use knowledge_extractor::version;
/// println!("knowledge-extractor v{}", version());
/// ```
pub fn version() -> String {
    format!("{}.{}.{}", VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_is_semver() {
        let ver = version();
        assert_eq!(ver, "0.1.0");
        assert_eq!(ver.split('.').count(), 3);
    }
}
