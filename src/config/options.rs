/**
 * Per-component option structs mirroring the configuration table in spec
 * §6. Each struct has sensible defaults so a caller can override only
 * what it needs.
 */

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitConfig;
use crate::error::{Category, ErrorKind};
use crate::retry::{RetryPolicy, RetryStrategy};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentProcessorOptions {
    pub encoding: String,
    pub segment_by_paragraph: bool,
    pub strip_urls: bool,
    pub strip_emails: bool,
    pub min_line_length: usize,
}

impl Default for DocumentProcessorOptions {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            segment_by_paragraph: true,
            strip_urls: false,
            strip_emails: false,
            min_line_length: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlProcessorOptions {
    pub extract_title: bool,
    pub extract_meta: bool,
    pub extract_headings: bool,
    pub extract_links: bool,
    pub extract_images: bool,
    pub segment_by_headings: bool,
    pub remove_scripts: bool,
    pub remove_styles: bool,
}

impl Default for HtmlProcessorOptions {
    fn default() -> Self {
        Self {
            extract_title: true,
            extract_meta: true,
            extract_headings: true,
            extract_links: false,
            extract_images: false,
            segment_by_headings: true,
            remove_scripts: true,
            remove_styles: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfProcessorOptions {
    pub extract_metadata: bool,
    pub segment_by_pages: bool,
    pub segment_by_headers: bool,
    pub ocr_enabled: bool,
    pub tables_enabled: bool,
    pub page_range: Option<(usize, usize)>,
}

impl Default for PdfProcessorOptions {
    fn default() -> Self {
        Self {
            extract_metadata: true,
            segment_by_pages: true,
            segment_by_headers: false,
            ocr_enabled: false,
            tables_enabled: false,
            page_range: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeExtractorOptions {
    pub min_entity_confidence: f64,
    pub min_relationship_confidence: f64,
    pub output_dir: String,
}

impl Default for KnowledgeExtractorOptions {
    fn default() -> Self {
        Self {
            min_entity_confidence: 0.5,
            min_relationship_confidence: 0.5,
            output_dir: "./output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    pub max_attempts: u32,
    pub strategy: String,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            strategy: "exponential".to_string(),
            base_delay_ms: 100,
            max_delay_ms: 30_000,
            jitter: false,
        }
    }
}

impl RetryOptions {
    pub fn to_policy(&self) -> RetryPolicy {
        let strategy = match self.strategy.as_str() {
            "constant" => RetryStrategy::Constant,
            "linear" => RetryStrategy::Linear,
            "fibonacci" => RetryStrategy::Fibonacci,
            "random" => RetryStrategy::Random,
            _ => RetryStrategy::Exponential,
        };
        RetryPolicy {
            max_attempts: self.max_attempts,
            strategy,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: self.jitter,
            retryable_kinds: Vec::new(),
            non_retryable_kinds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerOptions {
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerOptions {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_ms: 60_000,
            half_open_max_calls: 1,
        }
    }
}

impl CircuitBreakerOptions {
    pub fn to_config(&self) -> CircuitConfig {
        CircuitConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_millis(self.recovery_timeout_ms),
            half_open_max_calls: self.half_open_max_calls,
            allowed_categories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackOptions {
    pub quality_estimates: Option<Vec<f64>>,
    pub wrap_result: bool,
}

impl Default for FallbackOptions {
    fn default() -> Self {
        Self { quality_estimates: None, wrap_result: true }
    }
}

impl FallbackOptions {
    /// Apply this config onto a freshly built `FallbackStrategy`, mirroring
    /// `RetryOptions::to_policy`/`CircuitBreakerOptions::to_config` — the
    /// config struct stays a plain data holder and the wiring lives here.
    pub fn apply<T>(&self, strategy: crate::fallback::FallbackStrategy<T>) -> crate::fallback::FallbackStrategy<T> {
        let strategy = strategy.with_wrap_result(self.wrap_result);
        match &self.quality_estimates {
            Some(estimates) => strategy.with_quality_estimates(estimates.clone()),
            None => strategy,
        }
    }
}

/// Top-level document the config loader reads (spec §6's per-component
/// table, flattened into one TOML document).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Options {
    pub document_processor: DocumentProcessorOptions,
    pub html_processor: HtmlProcessorOptions,
    pub pdf_processor: PdfProcessorOptions,
    pub knowledge_extractor: KnowledgeExtractorOptions,
    pub retry: RetryOptions,
    pub circuit_breaker: CircuitBreakerOptions,
    pub fallback: FallbackOptions,
}

pub fn classify_error_kind_name(name: &str) -> Option<ErrorKind> {
    let kinds = [
        ErrorKind::DocumentRead,
        ErrorKind::DocumentParse,
        ErrorKind::DocumentEncoding,
        ErrorKind::UrlFetch,
        ErrorKind::NoEntitiesFound,
        ErrorKind::EntityExtraction,
        ErrorKind::NoRelationshipsFound,
        ErrorKind::RelationshipExtraction,
        ErrorKind::GraphDatabase,
        ErrorKind::SchemaValidation,
        ErrorKind::CheckpointError,
        ErrorKind::TransactionError,
        ErrorKind::CircuitOpen,
        ErrorKind::Internal,
    ];
    kinds.into_iter().find(|k| k.name().eq_ignore_ascii_case(name))
}

pub fn classify_category_name(name: &str) -> Option<Category> {
    match name.to_ascii_lowercase().as_str() {
        "transient" => Some(Category::Transient),
        "permanent" => Some(Category::Permanent),
        "resource" => Some(Category::Resource),
        "timeout" => Some(Category::Timeout),
        "authentication" => Some(Category::Authentication),
        "data" => Some(Category::Data),
        "system" => Some(Category::System),
        "unknown" => Some(Category::Unknown),
        _ => None,
    }
}
