/**
 * Pattern-based recognizer: per entity type, an ordered list of compiled
 * case-insensitive regexes (spec §4.8).
 *
 * PATTERN: original_source/.../entity_recognition/pattern_recognizer.py;
 * `regex` is the teacher's own choice for pattern matching (see its
 * deleted `pattern.rs`/`matching.rs`).
 */

use regex::RegexBuilder;

use crate::error::{Error, ErrorKind};

use super::recognizer::{heuristic_confidence, Recognizer};
use super::{Entity, EntityType, Span};

pub struct PatternRecognizer {
    patterns: Vec<(EntityType, Vec<regex::Regex>)>,
}

impl PatternRecognizer {
    pub fn new() -> Result<Self, Error> {
        Self::with_patterns(default_patterns())
    }

    /// `custom-patterns` config option: type -> [regex source] (spec §6).
    pub fn with_patterns(patterns: Vec<(EntityType, Vec<String>)>) -> Result<Self, Error> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for (entity_type, sources) in patterns {
            let mut regexes = Vec::with_capacity(sources.len());
            for source in sources {
                let re = RegexBuilder::new(&source)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| Error::new(ErrorKind::Internal, format!("invalid pattern '{source}': {e}")))?;
                regexes.push(re);
            }
            compiled.push((entity_type, regexes));
        }
        Ok(Self { patterns: compiled })
    }
}

fn default_patterns() -> Vec<(EntityType, Vec<String>)> {
    vec![
        (
            EntityType::Model,
            vec![r"\bGPT-\d(?:\.\d)?\b".into(), r"\bBERT\b".into(), r"\bT5\b".into(), r"\bResNet(?:-\d+)?\b".into()],
        ),
        (EntityType::Dataset, vec![r"\bImageNet\b".into(), r"\bCOCO\b".into(), r"\bSQuAD\b".into(), r"\bWikiText\b".into()]),
        (EntityType::Benchmark, vec![r"\bMMLU\b".into(), r"\bGLUE\b".into(), r"\bSuperGLUE\b".into()]),
        (EntityType::Framework, vec![r"\bPyTorch\b".into(), r"\bTensorFlow\b".into(), r"\bJAX\b".into()]),
        (EntityType::Library, vec![r"\bHugging ?Face\b".into(), r"\bscikit-learn\b".into()]),
        (EntityType::Metric, vec![r"\b(?:accuracy|F1|BLEU|perplexity)\b".into()]),
        (EntityType::Institution, vec![r"\b(?:Google|OpenAI|DeepMind|Meta AI|Microsoft Research)\b".into()]),
    ]
}

impl Recognizer for PatternRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>, Error> {
        let mut out = Vec::new();
        for (entity_type, regexes) in &self.patterns {
            for re in regexes {
                for m in re.find_iter(text) {
                    let confidence = heuristic_confidence(m.as_str(), *entity_type, text, m.start(), m.end());
                    out.push(
                        Entity::new(m.as_str(), *entity_type, confidence)
                            .with_span(Span::new(m.start(), m.end())),
                    );
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_model_and_framework() {
        let recognizer = PatternRecognizer::new().unwrap();
        let entities = recognizer.recognize("GPT-4 uses PyTorch internally.").unwrap();
        assert!(entities.iter().any(|e| e.text == "GPT-4" && e.entity_type == EntityType::Model));
        assert!(entities.iter().any(|e| e.text == "PyTorch" && e.entity_type == EntityType::Framework));
    }

    #[test]
    fn all_confidences_are_in_unit_range() {
        let recognizer = PatternRecognizer::new().unwrap();
        let entities = recognizer
            .recognize("GPT-4 was trained on ImageNet and evaluated on MMLU. It uses PyTorch.")
            .unwrap();
        assert!(!entities.is_empty());
        assert!(entities.iter().all(|e| (0.0..=1.0).contains(&e.confidence)));
    }

    #[test]
    fn custom_patterns_are_respected() {
        let recognizer =
            PatternRecognizer::with_patterns(vec![(EntityType::Concept, vec![r"\bwidget\b".into()])]).unwrap();
        let entities = recognizer.recognize("A Widget appeared.").unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_type, EntityType::Concept);
    }
}
