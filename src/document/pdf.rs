/**
 * PDF processor.
 *
 * DESIGN DECISION: `PdfProcessor` holds an optional `Box<dyn PdfParser>`;
 * with none configured, `process` fails with `DocumentParse` so a fallback
 * chain takes over, exactly the "AI recognizer without a language model"
 * pattern from spec §9's open questions, applied to the other named
 * out-of-scope collaborator (concrete PDF parsing libraries, spec §1).
 *
 * PATTERN: original_source/.../document_processing/pdf_processor.py
 * (page iteration, whitespace cleanup, one segment per non-empty page).
 */

use std::collections::BTreeMap;

use crate::error::{Error, ErrorKind};

use super::{DocumentFormatProcessor, MetaValue, Metadata, ProcessedContent, Segment, SegmentKind};

/// `parse(bytes, page_range?) -> (text, [Segment], document_info)`
/// collaborator contract (spec §6). Concrete implementations (e.g. backed
/// by a real PDF library) are out of scope for this crate.
pub trait PdfParser: Send + Sync {
    fn parse(&self, bytes: &[u8], page_range: Option<(usize, usize)>) -> Result<PdfParseOutput, Error>;
}

pub struct PdfParseOutput {
    pub pages: Vec<String>,
    pub document_info: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct PdfProcessor {
    pub extract_metadata: bool,
    pub segment_by_pages: bool,
    pub page_range: Option<(usize, usize)>,
    parser: Option<Box<dyn PdfParser>>,
}

impl PdfProcessor {
    pub fn with_parser(mut self, parser: impl PdfParser + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }
}

impl DocumentFormatProcessor for PdfProcessor {
    fn process(&self, raw: &str) -> Result<ProcessedContent, Error> {
        let parser = self.parser.as_ref().ok_or_else(|| {
            Error::new(
                ErrorKind::DocumentParse,
                "no PdfParser configured; concrete PDF parsing is out of scope for this crate",
            )
        })?;

        let output = parser.parse(raw.as_bytes(), self.page_range)?;

        let mut segments = Vec::new();
        let mut cleaned_pages = Vec::with_capacity(output.pages.len());
        for (i, page) in output.pages.iter().enumerate() {
            let cleaned = page.split_whitespace().collect::<Vec<_>>().join(" ");
            if !cleaned.is_empty() {
                segments.push(Segment::new(format!("page{i}"), SegmentKind::Page, cleaned.clone()));
            }
            cleaned_pages.push(cleaned);
        }
        let text = cleaned_pages.join("\n\n");

        let mut metadata: Metadata = Metadata::new();
        metadata.insert("page_count".into(), MetaValue::from(output.pages.len()));
        metadata.insert("char_count".into(), MetaValue::from(text.chars().count()));
        metadata.insert("word_count".into(), MetaValue::from(text.split_whitespace().count()));
        if self.extract_metadata {
            for (k, v) in &output.document_info {
                metadata.insert(format!("doc_info:{k}"), MetaValue::from(v.clone()));
            }
        }

        Ok(ProcessedContent {
            text,
            metadata,
            segments: if self.segment_by_pages { segments } else { Vec::new() },
        })
    }
}
