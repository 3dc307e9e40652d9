/**
 * URL processor (wrapper).
 *
 * DESIGN DECISION: `UrlFetcher` is a trait, not a concrete HTTP client.
 * WHY: network fetching is named out of scope (spec §1's "external ...
 * adapters"); `UrlProcessor` only does the content-type sniffing and
 * metadata attachment spec §4.7 asks for, delegating the actual fetch.
 *
 * PATTERN: original_source/.../document_processing/url_processor.py
 * (fetch, sniff, write-to-temp, dispatch to the matching processor).
 */

use crate::error::{Error, ErrorKind};

use super::{DocumentFormatProcessor, DocumentProcessor, DocumentType, Metadata, ProcessedContent};

pub struct FetchedResponse {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
}

/// `fetch(url) -> FetchedResponse` collaborator contract; concrete HTTP
/// clients are out of scope.
pub trait UrlFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedResponse, Error>;
}

fn sniff_document_type(content_type: Option<&str>, url: &str) -> DocumentType {
    if let Some(ct) = content_type {
        if ct.contains("html") {
            return DocumentType::Html;
        }
        if ct.contains("pdf") {
            return DocumentType::Pdf;
        }
        if ct.contains("text/plain") {
            return DocumentType::Text;
        }
    }
    DocumentType::detect(std::path::Path::new(url))
}

pub struct UrlProcessor<'a> {
    fetcher: &'a dyn UrlFetcher,
    dispatcher: &'a DocumentProcessor,
}

impl<'a> UrlProcessor<'a> {
    pub fn new(fetcher: &'a dyn UrlFetcher, dispatcher: &'a DocumentProcessor) -> Self {
        Self { fetcher, dispatcher }
    }

    pub fn process(&self, url: &str) -> Result<ProcessedContent, Error> {
        let response = self.fetcher.fetch(url).map_err(|e| {
            Error::new(ErrorKind::UrlFetch, format!("fetching {url}: {e}")).with_source(e)
        })?;

        let document_type = sniff_document_type(response.content_type.as_deref(), url);
        let body = String::from_utf8(response.body).map_err(|e| {
            Error::new(ErrorKind::DocumentEncoding, format!("{url}: {e}"))
        })?;

        let processor = match document_type {
            DocumentType::Pdf => &self.dispatcher.pdf as &dyn DocumentFormatProcessor,
            DocumentType::Html => &self.dispatcher.html as &dyn DocumentFormatProcessor,
            DocumentType::Text | DocumentType::Markdown => &self.dispatcher.text as &dyn DocumentFormatProcessor,
        };

        let mut result = processor.process(&body)?;
        attach_url_metadata(&mut result.metadata, url, &response.headers);
        Ok(result)
    }
}

fn attach_url_metadata(metadata: &mut Metadata, url: &str, headers: &[(String, String)]) {
    use super::MetaValue;
    metadata.insert("source_url".into(), MetaValue::from(url.to_string()));
    for (key, value) in headers {
        metadata.insert(format!("header:{key}"), MetaValue::from(value.clone()));
    }
}
