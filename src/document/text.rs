/**
 * Plain-text processor.
 *
 * PATTERN: original_source/.../document_processing/text_processor.py
 * (trim, optional whitespace collapse, optional URL/email strip,
 * paragraph segmentation by blank lines).
 */

use regex::Regex;
use std::sync::OnceLock;

use crate::error::Error;

use super::{DocumentFormatProcessor, MetaValue, Metadata, ProcessedContent, Segment, SegmentKind};

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").expect("static pattern"))
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").expect("static pattern"))
}

#[derive(Debug, Clone)]
pub struct TextProcessor {
    pub collapse_whitespace: bool,
    pub strip_urls: bool,
    pub strip_emails: bool,
    pub segment_by_paragraph: bool,
    pub min_line_length: usize,
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self {
            collapse_whitespace: false,
            strip_urls: false,
            strip_emails: false,
            segment_by_paragraph: true,
            min_line_length: 1,
        }
    }
}

impl DocumentFormatProcessor for TextProcessor {
    fn process(&self, raw: &str) -> Result<ProcessedContent, Error> {
        let mut text = raw.trim().to_string();

        if self.strip_urls {
            text = url_pattern().replace_all(&text, "").to_string();
        }
        if self.strip_emails {
            text = email_pattern().replace_all(&text, "").to_string();
        }
        if self.collapse_whitespace {
            text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        }

        let line_count = if text.is_empty() { 0 } else { text.lines().count() };
        let char_count = text.chars().count();
        let word_count = text.split_whitespace().count();

        let mut metadata: Metadata = Metadata::new();
        metadata.insert("char_count".into(), MetaValue::from(char_count));
        metadata.insert("word_count".into(), MetaValue::from(word_count));
        metadata.insert("line_count".into(), MetaValue::from(line_count));

        let segments = if self.segment_by_paragraph {
            paragraphs(&text, self.min_line_length)
        } else {
            Vec::new()
        };

        Ok(ProcessedContent { text, metadata, segments })
    }
}

fn paragraphs(text: &str, min_line_length: usize) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    for (i, chunk) in text.split("\n\n").enumerate() {
        let trimmed = chunk.trim();
        let start = offset + chunk.find(trimmed).unwrap_or(0);
        offset += chunk.len() + 2;
        if trimmed.len() < min_line_length {
            continue;
        }
        out.push(
            Segment::new(format!("p{i}"), SegmentKind::Paragraph, trimmed)
                .with_offsets(start, start + trimmed.len()),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_has_zero_line_count() {
        let processor = TextProcessor::default();
        let result = processor.process("   ").unwrap();
        assert_eq!(result.metadata.get("line_count"), Some(&MetaValue::Int(0)));
    }

    #[test]
    fn segments_by_blank_lines() {
        let processor = TextProcessor::default();
        let result = processor.process("First para.\n\nSecond para.").unwrap();
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0].content, "First para.");
        assert_eq!(result.segments[1].content, "Second para.");
    }

    #[test]
    fn strips_urls_and_emails() {
        let processor = TextProcessor {
            strip_urls: true,
            strip_emails: true,
            ..Default::default()
        };
        let result = processor
            .process("Visit https://example.com or mail a@b.com for info.")
            .unwrap();
        assert!(!result.text.contains("https://"));
        assert!(!result.text.contains("@"));
    }

    #[test]
    fn collapses_whitespace_when_enabled() {
        let processor = TextProcessor {
            collapse_whitespace: true,
            ..Default::default()
        };
        let result = processor.process("a   b\tc\n\nd").unwrap();
        assert!(!result.text.contains("  "));
    }
}
