/**
 * Dictionary recognizer: whole-word lookup against a
 * {lowercased surface -> (type, base confidence)} map (spec §4.8).
 *
 * PATTERN: original_source/.../entity_recognition/dictionary_recognizer.py.
 */

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Error;

use super::recognizer::Recognizer;
use super::{Entity, EntityType, Span};

fn word_boundary_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9][A-Za-z0-9._-]*").expect("static pattern"))
}

pub struct DictionaryRecognizer {
    entries: HashMap<String, (EntityType, f64)>,
}

impl DictionaryRecognizer {
    pub fn new(entries: HashMap<String, (EntityType, f64)>) -> Self {
        Self { entries }
    }

    pub fn with_default_entries() -> Self {
        let mut entries = HashMap::new();
        entries.insert("gpt-4".to_string(), (EntityType::Model, 0.9));
        entries.insert("bert".to_string(), (EntityType::Model, 0.9));
        entries.insert("imagenet".to_string(), (EntityType::Dataset, 0.9));
        entries.insert("pytorch".to_string(), (EntityType::Framework, 0.9));
        entries.insert("mmlu".to_string(), (EntityType::Benchmark, 0.85));
        entries.insert("google".to_string(), (EntityType::Institution, 0.85));
        Self::new(entries)
    }
}

impl Recognizer for DictionaryRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>, Error> {
        let mut out = Vec::new();
        for m in word_boundary_pattern().find_iter(text) {
            if let Some((entity_type, confidence)) = self.entries.get(&m.as_str().to_ascii_lowercase()) {
                out.push(
                    Entity::new(m.as_str(), *entity_type, *confidence)
                        .with_span(Span::new(m.start(), m.end())),
                );
            }
        }
        Ok(out)
    }
}
