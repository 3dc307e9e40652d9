/**
 * End-to-end scenarios covering the document -> entity -> relationship
 * pipeline and the resilience fabric it runs on top of.
 */

use std::time::Duration;

use knowledge_extractor::circuit_breaker::{CircuitBreaker, CircuitConfig, CircuitState};
use knowledge_extractor::composite::{CompositeExtractor, CompositeRecognizer};
use knowledge_extractor::document::DocumentProcessor;
use knowledge_extractor::entity::dictionary::DictionaryRecognizer;
use knowledge_extractor::entity::pattern::PatternRecognizer;
use knowledge_extractor::progressive::{ExtractionLevel, ProgressiveExtractor};
use knowledge_extractor::relationship::pattern::PatternRelationshipExtractor;
use knowledge_extractor::retry::{RetryEngine, RetryPolicy, RetryStrategy};
use knowledge_extractor::transaction::{Transaction, TransactionStatus};
use knowledge_extractor::document::FilesystemReader;
use knowledge_extractor::{DocumentType, Error, ErrorKind, KnowledgeExtractor, KnowledgeExtractorOptions};

fn build_extractor() -> KnowledgeExtractor {
    let recognizer = CompositeRecognizer::new(vec![
        Box::new(PatternRecognizer::new().unwrap()),
        Box::new(DictionaryRecognizer::with_default_entries()),
    ]);
    let relationship_extractor = CompositeExtractor::new(vec![Box::new(PatternRelationshipExtractor::new())]);
    KnowledgeExtractor::new(
        DocumentProcessor::new(),
        Box::new(recognizer),
        Box::new(relationship_extractor),
        KnowledgeExtractorOptions::default(),
    )
}

/// E2E-1: plain text extraction surfaces the Model/Dataset/Benchmark/
/// Framework entities and the TrainedOn/EvaluatedOn relationships between
/// them.
#[test]
fn plain_text_extraction_finds_entities_and_relationships() {
    let extractor = build_extractor();
    let summary = extractor.extract_from_text(
        "GPT-4 was trained on ImageNet and evaluated on MMLU. It uses PyTorch.",
        "e2e-text",
    );

    assert!(summary.error.is_none(), "extraction should succeed: {:?}", summary.error);
    assert!(summary.entity_count >= 3, "expected GPT-4/ImageNet/MMLU/PyTorch, got {}", summary.entity_count);
    assert!(summary.relationship_count >= 1, "expected at least a TrainedOn/EvaluatedOn edge");
}

/// E2E-2: HTML extraction segments by heading and still finds the
/// Model/Institution pair in the body text.
#[test]
fn html_extraction_segments_by_heading_and_finds_entities() {
    let extractor = build_extractor();
    let html = "<html><body><h1>BERT</h1><p>BERT was developed by Google.</p></body></html>";
    let summary = extractor.extract_from_text(html, "e2e-html");

    // the text processor runs over raw HTML tags for this scenario since
    // extract_from_text always dispatches to Text; the HTML-aware path is
    // exercised directly through the document processor instead.
    let processor = DocumentProcessor::new();
    let doc = processor
        .process_as_document(html, knowledge_extractor::DocumentType::Html, None)
        .unwrap();
    assert_eq!(doc.segments.len(), 1);
    assert_eq!(doc.segments[0].heading.as_deref(), Some("BERT"));
    assert!(summary.error.is_none());
}

/// E2E-2b: the same HTML scenario through the real public contract —
/// `extract_from_document` reading an `.html` file off disk, dispatching
/// to `DocumentType::Html`, and surfacing the BERT/Google/DEVELOPED_BY
/// entities and relationship rather than just the segment shape.
#[test]
fn html_document_extraction_via_filesystem_reader_finds_entities() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.html");
    std::fs::write(&path, "<html><body><h1>BERT</h1><p>BERT was developed by Google.</p></body></html>").unwrap();

    let extractor = build_extractor();
    let summary = extractor.extract_from_document(&path, &FilesystemReader);

    assert!(summary.error.is_none(), "extraction should succeed: {:?}", summary.error);
    assert_eq!(summary.document_type, DocumentType::Html);
    assert!(summary.entity_count >= 2, "expected BERT and Google, got {}", summary.entity_count);
    assert!(summary.relationship_count >= 1, "expected a DEVELOPED_BY edge");
}

/// E2E-3: a circuit breaker opens after its failure threshold, rejects
/// calls during the recovery window, then closes again once a half-open
/// probe succeeds.
#[test]
fn circuit_breaker_full_cycle() {
    let breaker = CircuitBreaker::new(
        "e2e-breaker",
        CircuitConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_millis(100),
            half_open_max_calls: 1,
            allowed_categories: vec![],
        },
    );

    for _ in 0..3 {
        let result: Result<(), Error> = breaker.call(|| Err(Error::new(ErrorKind::GraphDatabase, "down")));
        assert!(result.is_err());
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let rejected: Result<(), Error> = breaker.call(|| Ok(()));
    assert_eq!(rejected.unwrap_err().kind, ErrorKind::CircuitOpen);

    std::thread::sleep(Duration::from_millis(120));
    let recovered = breaker.call(|| Ok::<i32, Error>(1));
    assert!(recovered.is_ok());
    assert_eq!(breaker.state(), CircuitState::Closed);
}

/// E2E-4: exponential retry with a short base delay succeeds on the third
/// attempt after two transient failures.
#[test]
fn exponential_retry_succeeds_after_two_failures() {
    let engine = RetryEngine::new(RetryPolicy {
        max_attempts: 3,
        strategy: RetryStrategy::Exponential,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(200),
        jitter: false,
        retryable_kinds: Vec::new(),
        non_retryable_kinds: Vec::new(),
    });

    let attempts = std::cell::Cell::new(0);
    let result = engine.execute(|attempt| {
        attempts.set(attempt);
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

/// E2E-5: transactional rollback. Operation A commits and registers a
/// compensation; operation B raises, triggering automatic rollback which
/// invokes A's compensation.
#[test]
fn transaction_rolls_back_on_later_failure() {
    let compensated = std::rc::Rc::new(std::cell::RefCell::new(false));
    let compensated_clone = std::rc::Rc::clone(&compensated);

    let mut txn = Transaction::begin("e2e-rollback");
    txn.add_operation("A", || Ok(()), Some(move || *compensated_clone.borrow_mut() = true)).unwrap();
    txn.add_operation("B", || Err(Error::new(ErrorKind::Internal, "B failed")), None::<fn()>).unwrap();

    let result = txn.commit();
    assert!(result.is_err());
    assert_eq!(txn.status(), TransactionStatus::Failed);
    assert!(*compensated.borrow());
}

/// E2E-6: progressive fallback. FULL raises, STANDARD succeeds; the
/// extractor sticks at STANDARD on the next call instead of retrying FULL.
#[test]
fn progressive_fallback_descends_then_sticks() {
    let mut extractor = ProgressiveExtractor::new();
    let result = extractor
        .process("content", |level, _| match level {
            ExtractionLevel::Full => Err(Error::new(ErrorKind::EntityExtraction, "too strict")),
            ExtractionLevel::Standard => Ok("standard-result"),
            _ => Ok("deeper-result"),
        })
        .unwrap();

    assert!(result.from_fallback);
    assert_eq!(result.value, "standard-result");
    assert_eq!(extractor.current_level(), ExtractionLevel::Standard);

    let mut levels_seen = Vec::new();
    let _ = extractor.process("content", |level, _| {
        levels_seen.push(level);
        Ok("again")
    });
    assert_eq!(levels_seen, vec![ExtractionLevel::Standard]);
}
