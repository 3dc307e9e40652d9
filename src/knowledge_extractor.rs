/**
 * Knowledge Extractor (C11)
 *
 * DESIGN DECISION: per-document state lives in three `Mutex<HashMap<...>>`
 * maps (entities/relationships/graphs keyed by doc_id), each insert wrapped
 * in a one-operation `Transaction` so a later stage's failure can compensate
 * by removing what an earlier stage already committed.
 * WHY: spec §4.11/§5 — "Stage results are checkpointed through C4 inside a
 * C5 transaction; on transaction rollback, per-document state additions are
 * undone" and "mutates its in-memory per-document maps under a single lock
 * that protects insertions but not per-document sub-structures".
 *
 * PATTERN: spec §4.11's algorithm description orchestrates C7-C10 and
 * wraps stages with C2/C3/C6; no single original_source file maps onto
 * this orchestration role (it's assembled from the recovery fabric's
 * Python modules plus the entity_recognition/relationship pipeline).
 */

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentProcessor, DocumentReader, DocumentType};
use crate::entity::{self, Entity, Recognizer};
use crate::error::{Error, ErrorKind};
use crate::graph::KnowledgeGraph;
use crate::progressive::ExtractionLevel;
use crate::relationship::{self, extractor::RelationshipExtractor, Relationship};
use crate::retry::{RetryEngine, RetryPolicy};
use crate::transaction::Transaction;

/// Re-exported so `KnowledgeExtractor::new`'s options type and
/// `config::Options::knowledge_extractor`'s field type are the same
/// struct, not two identically-shaped copies.
pub use crate::config::options::KnowledgeExtractorOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub document_id: String,
    pub document_type: DocumentType,
    pub extraction_time_ms: u64,
    pub entity_count: usize,
    pub relationship_count: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub documents_processed: usize,
    pub total_entities: usize,
    pub total_relationships: usize,
    pub entities_by_type: BTreeMap<String, usize>,
    pub average_entity_confidence: f64,
    pub average_relationship_confidence: f64,
}

struct DocumentState {
    document: Document,
    entities: Vec<Entity>,
    relationships: Vec<Relationship>,
    graph: KnowledgeGraph,
}

struct LevelPipeline {
    level: ExtractionLevel,
    recognizer: Box<dyn Recognizer>,
    relationship_extractor: Box<dyn RelationshipExtractor>,
}

/// Orchestrates C7-C10; thread-safe at the document granularity (spec
/// §4.11). Synchronous: callers wanting concurrency run multiple documents
/// on separate threads, each call into this type serializing only on the
/// insertion lock, not on a per-document basis.
///
/// Holds one recognizer/extractor pair per extraction level (spec §4.12);
/// `new` builds a single-level (FULL-only) extractor, `with_levels` builds
/// the full FULL/STANDARD/BASIC/MINIMAL ladder. A level that raises or
/// yields zero entities above `min_entity_confidence` causes C11 to
/// descend to the next level, sticking at the level that last worked
/// (mirrors `ProgressiveExtractor`'s behavior, inlined here since each
/// level also needs its own retry-wrapped recognizer/extractor call).
pub struct KnowledgeExtractor {
    document_processor: DocumentProcessor,
    levels: Vec<LevelPipeline>,
    options: KnowledgeExtractorOptions,
    retry: RetryEngine,
    current_level: Mutex<usize>,
    state: Arc<Mutex<BTreeMap<String, DocumentState>>>,
}

impl KnowledgeExtractor {
    pub fn new(
        document_processor: DocumentProcessor,
        recognizer: Box<dyn Recognizer>,
        relationship_extractor: Box<dyn RelationshipExtractor>,
        options: KnowledgeExtractorOptions,
    ) -> Self {
        Self::with_levels(
            document_processor,
            vec![(ExtractionLevel::Full, recognizer, relationship_extractor)],
            options,
        )
    }

    /// Builds an extractor that descends through `levels` (spec §4.12's
    /// FULL/STANDARD/BASIC/MINIMAL table) when a higher level fails or
    /// finds nothing. `levels` is sorted by fidelity (FULL first)
    /// regardless of the order passed in.
    pub fn with_levels(
        document_processor: DocumentProcessor,
        mut levels: Vec<(ExtractionLevel, Box<dyn Recognizer>, Box<dyn RelationshipExtractor>)>,
        options: KnowledgeExtractorOptions,
    ) -> Self {
        levels.sort_by_key(|(level, _, _)| *level);
        let levels = levels
            .into_iter()
            .map(|(level, recognizer, relationship_extractor)| LevelPipeline { level, recognizer, relationship_extractor })
            .collect();
        Self {
            document_processor,
            levels,
            options,
            retry: RetryEngine::new(RetryPolicy::default()),
            current_level: Mutex::new(0),
            state: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// The extraction level the next call will start at (spec §4.12: sticks
    /// at the last level that worked instead of retrying FULL every time).
    pub fn current_level(&self) -> ExtractionLevel {
        let idx = *self.current_level.lock().unwrap();
        self.levels[idx].level
    }

    /// Overrides the default retry policy wrapping C8/C9 (spec §6's
    /// RetryEngine config row), e.g. built from a loaded
    /// `config::Options::retry.to_policy()`.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryEngine::new(policy);
        self
    }

    pub fn extract_from_document(&self, path: &std::path::Path, reader: &dyn DocumentReader) -> Summary {
        let document_id = path.display().to_string();
        match self.document_processor.process_path(path, reader) {
            Ok(document) => self.run_pipeline(document_id, document),
            Err(err) => self.failed_summary(document_id, DocumentType::Text, err),
        }
    }

    pub fn extract_from_text(&self, text: &str, document_id: impl Into<String>) -> Summary {
        let document_id = document_id.into();
        match self
            .document_processor
            .process_as_document(text, DocumentType::Text, None)
        {
            Ok(document) => self.run_pipeline(document_id, document),
            Err(err) => self.failed_summary(document_id, DocumentType::Text, err),
        }
    }

    fn failed_summary(&self, document_id: String, document_type: DocumentType, err: Error) -> Summary {
        Summary {
            document_id,
            document_type,
            extraction_time_ms: 0,
            entity_count: 0,
            relationship_count: 0,
            error: Some(err.kind.name().to_string()),
        }
    }

    fn run_pipeline(&self, document_id: String, document: Document) -> Summary {
        let start = std::time::Instant::now();
        let document_type = document.document_type;

        let result = self.try_pipeline(&document_id, &document);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok((entity_count, relationship_count)) => Summary {
                document_id,
                document_type,
                extraction_time_ms: elapsed_ms,
                entity_count,
                relationship_count,
                error: None,
            },
            Err(err) => Summary {
                document_id,
                document_type,
                extraction_time_ms: elapsed_ms,
                entity_count: 0,
                relationship_count: 0,
                error: Some(err.kind.name().to_string()),
            },
        }
    }

    fn try_pipeline(&self, document_id: &str, document: &Document) -> Result<(usize, usize), Error> {
        let start_idx = *self.current_level.lock().unwrap();
        let mut last_error = None;
        let mut found = None;

        for idx in start_idx..self.levels.len() {
            let level = &self.levels[idx];
            let raw_entities = match self.recognize_with_retry(level.recognizer.as_ref(), &document.content) {
                Ok(entities) => entities,
                Err(err) => {
                    tracing::warn!(level = ?level.level, error = %err, "entity recognition failed at this level, descending");
                    last_error = Some(err);
                    continue;
                }
            };
            let filtered_entities = entity::filter(&raw_entities, Some(self.options.min_entity_confidence), None);
            if filtered_entities.is_empty() {
                tracing::warn!(level = ?level.level, "no entities above confidence threshold, descending");
                last_error = Some(Error::new(ErrorKind::NoEntitiesFound, "no entities above confidence threshold"));
                continue;
            }

            let raw_relationships =
                match self.extract_relationships_with_retry(level.relationship_extractor.as_ref(), &document.content, &filtered_entities) {
                    Ok(relationships) => relationships,
                    Err(err) => {
                        tracing::warn!(level = ?level.level, error = %err, "relationship extraction failed at this level, descending");
                        last_error = Some(err);
                        continue;
                    }
                };
            let filtered_relationships =
                relationship::filter(&raw_relationships, Some(self.options.min_relationship_confidence), None);

            found = Some((idx, filtered_entities, filtered_relationships));
            break;
        }

        let (matched_idx, filtered_entities, filtered_relationships) = found.ok_or_else(|| {
            last_error.unwrap_or_else(|| Error::new(ErrorKind::NoEntitiesFound, "no extraction level produced entities"))
        })?;
        *self.current_level.lock().unwrap() = matched_idx;

        let graph = KnowledgeGraph::build(document_id, Utc::now(), &filtered_entities, &filtered_relationships);

        let entity_count = filtered_entities.len();
        let relationship_count = filtered_relationships.len();

        let document_id_owned = document_id.to_string();
        let mut txn = Transaction::begin(format!("store-{document_id_owned}"));
        {
            let id_for_action = document_id_owned.clone();
            let id_for_compensation = document_id_owned.clone();
            let document = document.clone();
            let entities = filtered_entities;
            let relationships = filtered_relationships;
            let state_for_action = Arc::clone(&self.state);
            let state_for_compensation = Arc::clone(&self.state);

            txn.add_operation(
                "insert-document-state",
                move || {
                    let mut guard = state_for_action.lock().unwrap();
                    guard.insert(
                        id_for_action.clone(),
                        DocumentState { document, entities, relationships, graph },
                    );
                    Ok(())
                },
                Some(move || {
                    let mut guard = state_for_compensation.lock().unwrap();
                    guard.remove(&id_for_compensation);
                }),
            )?;
        }
        txn.commit()?;

        Ok((entity_count, relationship_count))
    }

    fn recognize_with_retry(&self, recognizer: &dyn Recognizer, text: &str) -> Result<Vec<Entity>, Error> {
        let result = self.retry.execute(|_attempt| recognizer.recognize(text));
        result.value.ok_or_else(|| {
            result
                .error
                .unwrap_or_else(|| Error::new(ErrorKind::EntityExtraction, "entity recognition failed"))
        })
    }

    fn extract_relationships_with_retry(
        &self,
        relationship_extractor: &dyn RelationshipExtractor,
        text: &str,
        entities: &[Entity],
    ) -> Result<Vec<Relationship>, Error> {
        let result = self.retry.execute(|_attempt| relationship_extractor.extract(text, entities));
        result.value.ok_or_else(|| {
            result
                .error
                .unwrap_or_else(|| Error::new(ErrorKind::RelationshipExtraction, "relationship extraction failed"))
        })
    }

    /// Writes `entities.json`, `relationships.json`, `knowledge_graph.json`
    /// for `document_id` (or every stored document if `None`) plus a global
    /// `extraction_statistics.json` (spec §6).
    pub fn save_extraction_results(&self, output_dir: &std::path::Path, document_id: Option<&str>) -> Result<std::path::PathBuf, Error> {
        let guard = self.state.lock().unwrap();
        let ids: Vec<String> = match document_id {
            Some(id) => vec![id.to_string()],
            None => guard.keys().cloned().collect(),
        };

        for id in &ids {
            let Some(state) = guard.get(id) else { continue };
            let doc_dir = output_dir.join(sanitize(id));
            std::fs::create_dir_all(&doc_dir).map_err(|e| crate::error::classify_io(&e, doc_dir.display().to_string()))?;

            write_json(&doc_dir.join("entities.json"), &state.entities)?;
            write_json(&doc_dir.join("relationships.json"), &state.relationships)?;
            write_json(&doc_dir.join("knowledge_graph.json"), &state.graph)?;
        }

        drop(guard);
        let stats = self.get_extraction_statistics();
        std::fs::create_dir_all(output_dir).map_err(|e| crate::error::classify_io(&e, output_dir.display().to_string()))?;
        write_json(&output_dir.join("extraction_statistics.json"), &stats)?;

        Ok(output_dir.to_path_buf())
    }

    pub fn get_extraction_statistics(&self) -> Stats {
        let guard = self.state.lock().unwrap();
        let mut stats = Stats::default();
        stats.documents_processed = guard.len();

        let mut entity_confidence_sum = 0.0;
        let mut relationship_confidence_sum = 0.0;

        for state in guard.values() {
            stats.total_entities += state.entities.len();
            stats.total_relationships += state.relationships.len();
            for entity in &state.entities {
                entity_confidence_sum += entity.confidence;
                *stats.entities_by_type.entry(format!("{:?}", entity.entity_type)).or_insert(0) += 1;
            }
            for relationship in &state.relationships {
                relationship_confidence_sum += relationship.confidence;
            }
        }

        if stats.total_entities > 0 {
            stats.average_entity_confidence = entity_confidence_sum / stats.total_entities as f64;
        }
        if stats.total_relationships > 0 {
            stats.average_relationship_confidence = relationship_confidence_sum / stats.total_relationships as f64;
        }

        stats
    }
}

fn sanitize(id: &str) -> String {
    id.chars().map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' }).collect()
}

fn write_json<T: Serialize>(path: &std::path::Path, value: &T) -> Result<(), Error> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| crate::error::classify_json(&e, "serialize extraction artefact"))?;
    std::fs::write(path, json).map_err(|e| crate::error::classify_io(&e, path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::CompositeRecognizer;
    use crate::entity::{dictionary::DictionaryRecognizer, pattern::PatternRecognizer};
    use crate::relationship::pattern::PatternRelationshipExtractor;
    use tempfile::tempdir;

    fn build_extractor() -> KnowledgeExtractor {
        let recognizer = CompositeRecognizer::new(vec![
            Box::new(PatternRecognizer::new().unwrap()),
            Box::new(DictionaryRecognizer::with_default_entries()),
        ]);
        KnowledgeExtractor::new(
            DocumentProcessor::new(),
            Box::new(recognizer),
            Box::new(PatternRelationshipExtractor::new()),
            KnowledgeExtractorOptions::default(),
        )
    }

    #[test]
    fn extract_from_text_populates_statistics() {
        let extractor = build_extractor();
        let summary = extractor.extract_from_text(
            "GPT-4 was trained on ImageNet and evaluated on MMLU. It uses PyTorch.",
            "doc-1",
        );
        assert!(summary.error.is_none());
        assert!(summary.entity_count >= 3);

        let stats = extractor.get_extraction_statistics();
        assert_eq!(stats.documents_processed, 1);
        assert!(stats.total_entities >= 3);
    }

    #[test]
    fn with_retry_policy_uses_the_configured_options_loader() {
        use crate::config::Options;

        let mut config = Options::default();
        config.retry.max_attempts = 1;
        let policy = config.retry.to_policy();

        let extractor = build_extractor().with_retry_policy(policy);
        assert_eq!(extractor.retry.policy().max_attempts, 1);
    }

    #[test]
    fn extract_from_document_reads_a_real_file_via_filesystem_reader() {
        use crate::document::FilesystemReader;

        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "GPT-4 was trained on ImageNet and evaluated on MMLU.").unwrap();

        let extractor = build_extractor();
        let summary = extractor.extract_from_document(&path, &FilesystemReader);

        assert!(summary.error.is_none(), "{:?}", summary.error);
        assert_eq!(summary.document_type, DocumentType::Text);
        assert!(summary.entity_count >= 2);
    }

    #[test]
    fn no_entities_found_is_a_clean_failure() {
        let extractor = build_extractor();
        let summary = extractor.extract_from_text("completely unrelated filler text here", "doc-2");
        assert_eq!(summary.error.as_deref(), Some("NoEntitiesFound"));
        assert_eq!(summary.entity_count, 0);
    }

    #[test]
    fn save_extraction_results_writes_artefacts() {
        let extractor = build_extractor();
        extractor.extract_from_text("GPT-4 was trained on ImageNet.", "doc-3");
        let dir = tempdir().unwrap();
        extractor.save_extraction_results(dir.path(), None).unwrap();
        assert!(dir.path().join("extraction_statistics.json").exists());
        assert!(dir.path().join("doc-3").join("entities.json").exists());
    }

    #[test]
    fn descends_from_full_to_standard_and_sticks() {
        use crate::entity::ai::AiRecognizer;
        use crate::relationship::ai::AiRelationshipExtractor;

        // FULL has no language model configured, so it always fails (spec
        // §9's AI-recognizer-without-a-model open question); STANDARD's
        // pattern recognizer should pick up the slack.
        let extractor = KnowledgeExtractor::with_levels(
            DocumentProcessor::new(),
            vec![
                (ExtractionLevel::Full, Box::new(AiRecognizer::new(None)), Box::new(AiRelationshipExtractor::new(None))),
                (
                    ExtractionLevel::Standard,
                    Box::new(PatternRecognizer::new().unwrap()),
                    Box::new(PatternRelationshipExtractor::new()),
                ),
            ],
            KnowledgeExtractorOptions::default(),
        )
        .with_retry_policy(RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        });

        assert_eq!(extractor.current_level(), ExtractionLevel::Full);
        let summary = extractor.extract_from_text("GPT-4 was trained on ImageNet.", "doc-4");
        assert!(summary.error.is_none(), "{:?}", summary.error);
        assert_eq!(extractor.current_level(), ExtractionLevel::Standard);

        // a second document should start at STANDARD, not retry FULL.
        let summary2 = extractor.extract_from_text("BERT was developed by Google.", "doc-5");
        assert!(summary2.error.is_none());
        assert_eq!(extractor.current_level(), ExtractionLevel::Standard);
    }
}
