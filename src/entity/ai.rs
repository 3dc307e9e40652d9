/**
 * AI recognizer: dispatches to an external language-model adapter and
 * augments model-typed entities with dataset/metric/architecture
 * derivations (spec §4.8, §6).
 *
 * DESIGN DECISION: without a configured `LanguageModel`, `recognize`
 * always fails so a fallback chain takes over.
 * WHY: spec §9 open question — "Behaviour of AI recognizers without a
 * language model available: treat as always-failing primary so fallbacks
 * take over" (DESIGN.md's Open Question decision).
 *
 * PATTERN: original_source/.../entity_recognition/ai_recognizer.py
 * (relational augmentation windows, model->architecture map).
 */

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::error::{Error, ErrorKind};

use super::recognizer::Recognizer;
use super::{Entity, EntityType, Span};

/// `extract_entities(text, hints) -> [Entity]` collaborator contract
/// (spec §6); concrete adapters are out of scope.
pub trait LanguageModel: Send + Sync {
    fn extract_entities(&self, text: &str, hints: &[String]) -> Result<Vec<Entity>, Error>;
}

fn dataset_cue_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bon\s+([A-Z][\w-]*)\s+dataset\b").expect("static pattern"))
}

fn metric_cue_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bachieved\s+([\d.]+%?)\s+(\w+)\b").expect("static pattern"))
}

fn model_to_architecture() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("bert", "Transformer"),
            ("gpt-4", "Transformer"),
            ("gpt-3", "Transformer"),
            ("resnet", "Convolutional Neural Network"),
            ("resnet-50", "Convolutional Neural Network"),
        ])
    })
}

pub struct AiRecognizer {
    model: Option<Arc<dyn LanguageModel>>,
    hints: Vec<String>,
}

impl AiRecognizer {
    pub fn new(model: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { model, hints: Vec::new() }
    }

    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints = hints;
        self
    }

    /// ±100-character window scan for "on X dataset" / "achieved N metric",
    /// plus the model->architecture lookup (spec §4.8).
    fn augment(&self, text: &str, entities: &[Entity]) -> Vec<Entity> {
        let mut derived = Vec::new();
        for entity in entities {
            if entity.entity_type != EntityType::Model {
                continue;
            }
            let Some(span) = entity.span else { continue };
            let window_start = span.start.saturating_sub(100);
            let window_end = (span.end + 100).min(text.len());
            let Some(window) = text.get(window_start..window_end) else { continue };

            if let Some(cap) = dataset_cue_pattern().captures(window) {
                derived.push(
                    Entity::new(cap[1].to_string(), EntityType::Dataset, 0.75)
                        .with_metadata("derived_from", entity.text.clone()),
                );
            }
            if let Some(cap) = metric_cue_pattern().captures(window) {
                derived.push(
                    Entity::new(cap[2].to_string(), EntityType::Metric, 0.75)
                        .with_metadata("derived_from", entity.text.clone())
                        .with_metadata("value", cap[1].to_string()),
                );
            }
            if let Some(architecture) = model_to_architecture().get(entity.text.to_ascii_lowercase().as_str()) {
                derived.push(
                    Entity::new(*architecture, EntityType::Architecture, 0.8)
                        .with_metadata("derived_from", entity.text.clone()),
                );
            }
        }
        derived
    }
}

impl Recognizer for AiRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>, Error> {
        let model = self.model.as_ref().ok_or_else(|| {
            Error::new(
                ErrorKind::EntityExtraction,
                "no LanguageModel configured for AiRecognizer",
            )
        })?;

        let mut entities = model.extract_entities(text, &self.hints)?;
        let derived = self.augment(text, &entities);
        entities.extend(derived);
        Ok(entities)
    }
}
