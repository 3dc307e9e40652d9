/**
 * Error Taxonomy Module
 *
 * DESIGN DECISION: Closed-enum error kinds carrying category/severity/retryable
 * metadata, rather than a flat string-typed error.
 * WHY: Every stage of the pipeline needs to answer "should this be retried?"
 * and "how loudly should this be logged?" without re-deriving the answer at
 * each call site.
 *
 * PATTERN: thiserror-derived enum + Result<T> alias (teacher's error.rs)
 */

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error as ThisError;

/// Broad failure category, used by the retry engine to decide retryability
/// and by callers to group errors for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Transient,
    Permanent,
    Resource,
    Timeout,
    Authentication,
    Data,
    System,
    Unknown,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Transient => "transient",
            Category::Permanent => "permanent",
            Category::Resource => "resource",
            Category::Timeout => "timeout",
            Category::Authentication => "authentication",
            Category::Data => "data",
            Category::System => "system",
            Category::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Severity at which an error should be logged/surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Named error kinds from the pipeline's failure taxonomy. Each kind has a
/// default (category, severity, retryable) triple; callers may override any
/// of the three when constructing an `Error` via the `with_*` builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DocumentRead,
    DocumentParse,
    DocumentEncoding,
    UrlFetch,
    NoEntitiesFound,
    EntityExtraction,
    NoRelationshipsFound,
    RelationshipExtraction,
    GraphDatabase,
    SchemaValidation,
    CheckpointError,
    TransactionError,
    CircuitOpen,
    Internal,
}

impl ErrorKind {
    /// Default (category, severity, retryable) for this kind, per spec §4.1/§7.
    pub fn defaults(self) -> (Category, Severity, bool) {
        use Category::*;
        use Severity::*;
        match self {
            ErrorKind::DocumentRead => (Permanent, Error, false),
            ErrorKind::DocumentParse => (Permanent, Error, false),
            ErrorKind::DocumentEncoding => (Permanent, Error, false),
            ErrorKind::UrlFetch => (Transient, Warning, true),
            ErrorKind::NoEntitiesFound => (Data, Info, false),
            ErrorKind::EntityExtraction => (Transient, Warning, true),
            ErrorKind::NoRelationshipsFound => (Data, Info, false),
            ErrorKind::RelationshipExtraction => (Transient, Warning, true),
            ErrorKind::GraphDatabase => (Transient, Error, true),
            ErrorKind::SchemaValidation => (Data, Error, false),
            ErrorKind::CheckpointError => (Permanent, Error, false),
            ErrorKind::TransactionError => (Permanent, Error, false),
            ErrorKind::CircuitOpen => (Resource, Warning, true),
            ErrorKind::Internal => (System, Critical, false),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::DocumentRead => "DocumentRead",
            ErrorKind::DocumentParse => "DocumentParse",
            ErrorKind::DocumentEncoding => "DocumentEncoding",
            ErrorKind::UrlFetch => "UrlFetch",
            ErrorKind::NoEntitiesFound => "NoEntitiesFound",
            ErrorKind::EntityExtraction => "EntityExtraction",
            ErrorKind::NoRelationshipsFound => "NoRelationshipsFound",
            ErrorKind::RelationshipExtraction => "RelationshipExtraction",
            ErrorKind::GraphDatabase => "GraphDatabase",
            ErrorKind::SchemaValidation => "SchemaValidation",
            ErrorKind::CheckpointError => "CheckpointError",
            ErrorKind::TransactionError => "TransactionError",
            ErrorKind::CircuitOpen => "CircuitOpen",
            ErrorKind::Internal => "Internal",
        }
    }
}

/// The pipeline's single error type. Carries enough structure for the retry
/// engine and fallback chain to make decisions without string matching.
#[derive(Debug, Clone, ThisError)]
#[error("{kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    pub retryable: bool,
    pub context: BTreeMap<String, String>,
    #[source]
    pub source: Option<Box<Error>>,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Error {
    /// Build an error from a kind using its default category/severity/retryable.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let (category, severity, retryable) = kind.defaults();
        Self {
            kind,
            category,
            severity,
            message: message.into(),
            retryable,
            context: BTreeMap::new(),
            source: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_source(mut self, source: Error) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Walk the cause chain, innermost last, for diagnostics.
    pub fn chain(&self) -> Vec<&Error> {
        let mut out = vec![self];
        let mut cur = &self.source;
        while let Some(e) = cur {
            out.push(e);
            cur = &e.source;
        }
        out
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Classify a filesystem I/O failure into the taxonomy (spec §7).
pub fn classify_io(err: &std::io::Error, path: impl AsRef<str>) -> Error {
    use std::io::ErrorKind as IoKind;
    let message = format!("{}: {}", path.as_ref(), err);
    match err.kind() {
        IoKind::NotFound | IoKind::PermissionDenied => {
            Error::new(ErrorKind::DocumentRead, message)
        }
        IoKind::InvalidData => Error::new(ErrorKind::DocumentEncoding, message),
        _ => Error::new(ErrorKind::DocumentRead, message),
    }
}

/// Classify a JSON (de)serialization failure.
pub fn classify_json(err: &serde_json::Error, context: impl AsRef<str>) -> Error {
    Error::new(
        ErrorKind::SchemaValidation,
        format!("{}: {}", context.as_ref(), err),
    )
}

/// Log an error at its configured severity and return it unchanged so the
/// caller can decide whether to propagate it with `?`. Mirrors the
/// classify/handle split from the recovery fabric's Python original, minus
/// the implicit re-raise (Rust callers always choose explicitly).
pub fn handle(error: Error, operation: &str) -> Error {
    match error.severity {
        Severity::Debug => tracing::debug!(kind = %error.kind, operation, "{}", error.message),
        Severity::Info => tracing::info!(kind = %error.kind, operation, "{}", error.message),
        Severity::Warning => tracing::warn!(kind = %error.kind, operation, "{}", error.message),
        Severity::Error => tracing::error!(kind = %error.kind, operation, "{}", error.message),
        Severity::Critical => {
            tracing::error!(kind = %error.kind, operation, critical = true, "{}", error.message)
        }
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let (cat, sev, retry) = ErrorKind::UrlFetch.defaults();
        assert_eq!(cat, Category::Transient);
        assert_eq!(sev, Severity::Warning);
        assert!(retry);

        let (cat, _, retry) = ErrorKind::NoEntitiesFound.defaults();
        assert_eq!(cat, Category::Data);
        assert!(!retry);
    }

    #[test]
    fn builders_override_defaults() {
        let err = Error::new(ErrorKind::DocumentRead, "boom").with_retryable(true);
        assert!(err.retryable);
        assert_eq!(err.kind, ErrorKind::DocumentRead);
    }

    #[test]
    fn chain_walks_sources() {
        let inner = Error::new(ErrorKind::Internal, "root cause");
        let outer = Error::new(ErrorKind::DocumentParse, "wrapper").with_source(inner);
        let chain = outer.chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].kind, ErrorKind::Internal);
    }

    #[test]
    fn classify_not_found_is_document_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = classify_io(&io_err, "foo.txt");
        assert_eq!(err.kind, ErrorKind::DocumentRead);
        assert!(!err.retryable);
    }
}
