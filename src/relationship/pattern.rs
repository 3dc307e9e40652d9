/**
 * Pattern relationship extractor: regex templates over
 * {source_text} ... {relation cue} ... {target_text} sliding windows
 * (spec §4.9).
 *
 * PATTERN: grounded in spec §4.9's algorithm description (no direct
 * original_source file; C9 has no standalone Python ancestor — see
 * DESIGN.md). Confidence decay matches the spec table exactly:
 * base - 0.05 per 100 chars beyond a 50-char allowance, clamped to >= 0.3.
 */

use crate::entity::Entity;
use crate::error::Error;

use super::{extractor::RelationshipExtractor, RelationType, Relationship};

/// One (relation type, base confidence, cue phrases) template.
pub struct Template {
    pub relation_type: RelationType,
    pub base_confidence: f64,
    pub cues: Vec<&'static str>,
}

/// Mandatory template families per DESIGN.md's Open Question decision
/// (spec §9): TRAINED_ON, EVALUATED_ON, OUTPERFORMS, DEVELOPED_BY,
/// BASED_ON, USES. Additional templates are supplied via config.
pub fn mandatory_templates() -> Vec<Template> {
    vec![
        Template { relation_type: RelationType::TrainedOn, base_confidence: 0.85, cues: vec!["trained on", "train on"] },
        Template { relation_type: RelationType::EvaluatedOn, base_confidence: 0.85, cues: vec!["evaluated on", "tested on"] },
        Template { relation_type: RelationType::Outperforms, base_confidence: 0.8, cues: vec!["outperforms", "outperformed", "beats"] },
        Template { relation_type: RelationType::DevelopedBy, base_confidence: 0.85, cues: vec!["developed by", "created by", "built by"] },
        Template { relation_type: RelationType::BasedOn, base_confidence: 0.75, cues: vec!["based on", "derived from"] },
        Template { relation_type: RelationType::Uses, base_confidence: 0.7, cues: vec!["uses", "using", "utilizes"] },
    ]
}

/// BASIC-level template set: a reduced subset per spec §4.12's progressive
/// extraction table ("patterns (reduced template set)").
pub fn reduced_templates() -> Vec<Template> {
    mandatory_templates()
        .into_iter()
        .filter(|t| matches!(t.relation_type, RelationType::TrainedOn | RelationType::EvaluatedOn))
        .collect()
}

fn confidence_for_distance(base: f64, distance: usize) -> f64 {
    let excess = distance.saturating_sub(50);
    let decay = (excess / 100) as f64 * 0.05;
    (base - decay).max(0.3)
}

pub struct PatternRelationshipExtractor {
    templates: Vec<Template>,
}

impl PatternRelationshipExtractor {
    pub fn new() -> Self {
        Self { templates: mandatory_templates() }
    }

    pub fn with_templates(templates: Vec<Template>) -> Self {
        Self { templates }
    }
}

impl Default for PatternRelationshipExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationshipExtractor for PatternRelationshipExtractor {
    fn extract(&self, text: &str, entities: &[Entity]) -> Result<Vec<Relationship>, Error> {
        let lower_text = text.to_ascii_lowercase();
        let mut out = Vec::new();

        for source in entities {
            let Some(source_span) = source.span else { continue };
            for target in entities {
                if source.id == target.id {
                    continue;
                }
                let Some(target_span) = target.span else { continue };
                if target_span.start < source_span.end {
                    continue;
                }

                let between_start = source_span.end.min(lower_text.len());
                let between_end = target_span.start.min(lower_text.len());
                let Some(between) = lower_text.get(between_start..between_end) else { continue };

                for template in &self.templates {
                    if template.cues.iter().any(|cue| between.contains(cue)) {
                        let distance = target_span.start - source_span.end;
                        let confidence = confidence_for_distance(template.base_confidence, distance);
                        out.push(
                            Relationship::new(source.id.clone(), target.id.clone(), template.relation_type, confidence)
                                .with_metadata("source_text", source.text.clone())
                                .with_metadata("target_text", target.text.clone()),
                        );
                        break;
                    }
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityType, Span};

    #[test]
    fn detects_trained_on_relationship() {
        let text = "GPT-4 was trained on ImageNet and evaluated on MMLU.";
        let gpt4 = Entity::new("GPT-4", EntityType::Model, 0.9).with_span(Span::new(0, 5));
        let imagenet = Entity::new("ImageNet", EntityType::Dataset, 0.9).with_span(Span::new(21, 29));
        let mmlu = Entity::new("MMLU", EntityType::Benchmark, 0.9).with_span(Span::new(47, 51));

        let extractor = PatternRelationshipExtractor::new();
        let relationships = extractor.extract(text, &[gpt4, imagenet, mmlu]).unwrap();

        assert!(relationships.iter().any(|r| r.relation_type == RelationType::TrainedOn));
        assert!(relationships.iter().any(|r| r.relation_type == RelationType::EvaluatedOn));
    }

    #[test]
    fn confidence_decays_with_distance() {
        let near = confidence_for_distance(0.85, 10);
        let far = confidence_for_distance(0.85, 400);
        assert!(far < near);
        assert!(far >= 0.3);
    }

    #[test]
    fn no_cue_between_entities_yields_no_relationship() {
        let text = "GPT-4 and ImageNet appear in the same sentence.";
        let gpt4 = Entity::new("GPT-4", EntityType::Model, 0.9).with_span(Span::new(0, 5));
        let imagenet = Entity::new("ImageNet", EntityType::Dataset, 0.9).with_span(Span::new(10, 18));
        let extractor = PatternRelationshipExtractor::new();
        let relationships = extractor.extract(text, &[gpt4, imagenet]).unwrap();
        assert!(relationships.is_empty());
    }
}
