/**
 * AI relationship extractor: dispatches to an external language-model
 * adapter (spec §4.9, §6). Used inside a fallback chain behind the pattern
 * extractor; without a configured model it always fails, mirroring
 * `entity::ai::AiRecognizer`'s Open Question decision (spec §9).
 */

use std::sync::Arc;

use crate::entity::Entity;
use crate::error::{Error, ErrorKind};

use super::{extractor::RelationshipExtractor, Relationship};

/// `extract_relationships(text, entities, hints) -> [Relationship]`
/// collaborator contract (spec §6); concrete adapters are out of scope.
pub trait LanguageModel: Send + Sync {
    fn extract_relationships(&self, text: &str, entities: &[Entity], hints: &[String]) -> Result<Vec<Relationship>, Error>;
}

pub struct AiRelationshipExtractor {
    model: Option<Arc<dyn LanguageModel>>,
    hints: Vec<String>,
}

impl AiRelationshipExtractor {
    pub fn new(model: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { model, hints: Vec::new() }
    }

    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints = hints;
        self
    }
}

impl RelationshipExtractor for AiRelationshipExtractor {
    fn extract(&self, text: &str, entities: &[Entity]) -> Result<Vec<Relationship>, Error> {
        let model = self.model.as_ref().ok_or_else(|| {
            Error::new(
                ErrorKind::RelationshipExtraction,
                "no LanguageModel configured for AiRelationshipExtractor",
            )
        })?;
        model.extract_relationships(text, entities, &self.hints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_model_extract_always_fails() {
        let extractor = AiRelationshipExtractor::new(None);
        let err = extractor.extract("text", &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RelationshipExtraction);
    }
}
