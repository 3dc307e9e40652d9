/**
 * HTML processor.
 *
 * DESIGN DECISION: a minimal internal tag-scanner rather than pulling in a
 * full DOM crate.
 * WHY: concrete HTML parsing libraries are named out of scope (spec §1);
 * the `HtmlParser` trait documents the collaborator contract callers may
 * substitute a real DOM-backed implementation for, while this processor's
 * default behaviour is enough to satisfy the heading-segmentation and
 * metadata-extraction contract on its own.
 *
 * PATTERN: original_source/.../document_processing/html_processor.py
 * (script/style removal, title/meta/OG extraction, heading-hierarchy
 * segmentation).
 */

use std::sync::OnceLock;

use regex::Regex;

use crate::error::Error;

use super::{DocumentFormatProcessor, MetaValue, Metadata, ProcessedContent, Segment, SegmentKind};

/// Collaborator contract for a real DOM-backed parser (spec §6). The
/// default `HtmlProcessor` implements its own lightweight version of this
/// behaviour directly; a concrete DOM library can be adapted behind this
/// trait instead.
pub trait HtmlParser {
    fn extract_text(&self, html: &str) -> String;
    fn extract_title(&self, html: &str) -> Option<String>;
}

fn script_style_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)[^>]*>.*?</\1>").expect("static pattern")
    })
}

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<[^>]+>").expect("static pattern"))
}

fn heading_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<h([1-6])[^>]*>(.*?)</h\1>").expect("static pattern"))
}

fn title_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static pattern"))
}

fn meta_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<meta\s+[^>]*name=["']([^"']+)["'][^>]*content=["']([^"']*)["'][^>]*>"#)
            .expect("static pattern")
    })
}

fn og_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<meta\s+[^>]*property=["']og:([^"']+)["'][^>]*content=["']([^"']*)["'][^>]*>"#)
            .expect("static pattern")
    })
}

fn canonical_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<link\s+[^>]*rel=["']canonical["'][^>]*href=["']([^"']+)["'][^>]*>"#)
            .expect("static pattern")
    })
}

fn strip_tags(fragment: &str) -> String {
    let decoded = tag_pattern().replace_all(fragment, " ");
    decoded
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone)]
pub struct HtmlProcessor {
    pub extract_title: bool,
    pub extract_meta: bool,
    pub extract_headings: bool,
    pub segment_by_headings: bool,
    pub remove_scripts: bool,
    pub remove_styles: bool,
}

impl Default for HtmlProcessor {
    fn default() -> Self {
        Self {
            extract_title: true,
            extract_meta: true,
            extract_headings: true,
            segment_by_headings: true,
            remove_scripts: true,
            remove_styles: true,
        }
    }
}

impl DocumentFormatProcessor for HtmlProcessor {
    fn process(&self, raw: &str) -> Result<ProcessedContent, Error> {
        let mut working = raw.to_string();
        if self.remove_scripts || self.remove_styles {
            working = script_style_pattern().replace_all(&working, "").to_string();
        }

        let mut metadata: Metadata = Metadata::new();

        if self.extract_title {
            if let Some(cap) = title_pattern().captures(&working) {
                metadata.insert("title".into(), MetaValue::from(strip_tags(&cap[1])));
            }
        }
        if self.extract_meta {
            for cap in meta_pattern().captures_iter(&working) {
                metadata.insert(format!("meta:{}", &cap[1]), MetaValue::from(cap[2].to_string()));
            }
            for cap in og_pattern().captures_iter(&working) {
                metadata.insert(format!("og:{}", &cap[1]), MetaValue::from(cap[2].to_string()));
            }
            if let Some(cap) = canonical_pattern().captures(&working) {
                metadata.insert("canonical_url".into(), MetaValue::from(cap[1].to_string()));
            }
        }

        let segments = if self.segment_by_headings {
            heading_segments(&working)
        } else {
            Vec::new()
        };

        let text = strip_tags(&working);
        let char_count = text.chars().count();
        let word_count = text.split_whitespace().count();
        let line_count = if text.is_empty() { 0 } else { 1 };
        metadata.insert("char_count".into(), MetaValue::from(char_count));
        metadata.insert("word_count".into(), MetaValue::from(word_count));
        metadata.insert("line_count".into(), MetaValue::from(line_count));

        Ok(ProcessedContent { text, metadata, segments })
    }
}

/// A segment starts at a heading and runs until the next heading of equal
/// or higher level (spec §4.7).
fn heading_segments(html: &str) -> Vec<Segment> {
    let matches: Vec<(usize, u8, String, std::ops::Range<usize>)> = heading_pattern()
        .captures_iter(html)
        .map(|cap| {
            let m = cap.get(0).unwrap();
            let level: u8 = cap[1].parse().unwrap_or(6);
            (m.start(), level, strip_tags(&cap[2]), m.range())
        })
        .collect();

    let mut out = Vec::new();
    for (i, (start, level, heading_text, heading_range)) in matches.iter().enumerate() {
        let content_start = heading_range.end;
        let content_end = matches[i + 1..]
            .iter()
            .find(|(_, other_level, _, _)| other_level <= level)
            .map(|(other_start, ..)| *other_start)
            .unwrap_or(html.len());
        let body = strip_tags(&html[content_start..content_end.min(html.len())]);
        out.push(
            Segment::new(format!("h{i}"), SegmentKind::HeadingSection, body)
                .with_heading(heading_text.clone(), *level)
                .with_offsets(*start, content_end),
        );
    }
    out
}
