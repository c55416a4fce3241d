//! PDF extraction: text, page count and the document-info dictionary via
//! `lopdf`.
//!
//! Parsing runs inside `spawn_blocking` because `lopdf` is synchronous and
//! CPU-bound on large files. A page whose text cannot be decoded is logged
//! and contributes nothing; a document that cannot be loaded at all is an
//! extraction failure.

use crate::config::{ConversionOptions, ConversionType};
use crate::error::ConvertError;
use crate::pipeline::input::{self, FileStats};
use crate::pipeline::text_stats::{self as ts, SUMMARY_HEAD_PARAGRAPHS, SUMMARY_TAIL_PARAGRAPHS};
use crate::pipeline::{insert_opt, into_map, Extracted};
use lopdf::{Dictionary, Document, Object};
use serde_json::json;
use std::path::Path;
use tracing::{debug, warn};

const FORMAT: &str = "pdf";

/// Everything read out of the PDF, before mode-specific shaping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfDocument {
    pub text: String,
    pub page_count: usize,
    pub info: PdfInfo,
}

/// Entries of the `/Info` dictionary that are present and non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

pub async fn extract(path: &Path, options: &ConversionOptions) -> Result<Extracted, ConvertError> {
    let stats = input::file_stats(path, FORMAT).await?;
    let bytes = input::read_bytes(path, FORMAT).await?;

    let doc = tokio::task::spawn_blocking(move || parse_pdf(&bytes))
        .await
        .map_err(|e| ConvertError::Internal(format!("PDF parse task panicked: {e}")))??;
    debug!(
        "PDF parsed: {} pages, {} chars of text",
        doc.page_count,
        doc.text.len()
    );

    Ok(build(&doc, &stats, options))
}

/// Load a PDF from memory and pull out its text and info dictionary.
pub fn parse_pdf(bytes: &[u8]) -> Result<PdfDocument, ConvertError> {
    let document = Document::load_mem(bytes).map_err(|e| ConvertError::extraction(FORMAT, e))?;

    let pages = document.get_pages();
    let mut page_texts = Vec::with_capacity(pages.len());
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => page_texts.push(text),
            Err(e) => warn!("Skipping text of page {}: {}", page_number, e),
        }
    }

    Ok(PdfDocument {
        text: page_texts.join("\n\n"),
        page_count: pages.len(),
        info: read_info(&document),
    })
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn read_info(document: &Document) -> PdfInfo {
    let Some(dict) = info_dictionary(document) else {
        return PdfInfo::default();
    };

    let field = |key: &[u8]| -> Option<String> {
        let object = match dict.get(key).ok()? {
            Object::Reference(id) => document.get_object(*id).ok()?,
            other => other,
        };
        match object {
            Object::String(bytes, _) => {
                let value = decode_pdf_string(bytes);
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            }
            _ => None,
        }
    };

    PdfInfo {
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
        creator: field(b"Creator"),
        producer: field(b"Producer"),
        creation_date: field(b"CreationDate"),
        modification_date: field(b"ModDate"),
    }
}

/// Decode a PDF text string: UTF-16BE when it carries a byte-order mark,
/// otherwise one byte per character.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Shape the parsed document into metadata and mode-specific content.
pub fn build(doc: &PdfDocument, stats: &FileStats, options: &ConversionOptions) -> Extracted {
    let text = doc.text.as_str();
    let words = ts::word_count(text);
    let paragraphs = ts::paragraphs(text);
    let lines = ts::trimmed_lines(text);

    let mut metadata = into_map(json!({
        "file_size": stats.size,
        "page_count": doc.page_count,
        "creation_date": stats.created_iso(),
        "word_count": words,
        "char_count": ts::char_count(text),
    }));
    insert_opt(&mut metadata, "title", doc.info.title.clone());
    insert_opt(&mut metadata, "author", doc.info.author.clone());
    insert_opt(&mut metadata, "subject", doc.info.subject.clone());
    insert_opt(&mut metadata, "creator", doc.info.creator.clone());
    insert_opt(&mut metadata, "producer", doc.info.producer.clone());
    insert_opt(&mut metadata, "pdf_creation_date", doc.info.creation_date.clone());
    insert_opt(&mut metadata, "pdf_modification_date", doc.info.modification_date.clone());

    let content = match options.conversion_type {
        ConversionType::Summary => json!({
            "description": format!(
                "PDF document with {} pages and {} words",
                doc.page_count, words
            ),
            "first_paragraphs": ts::head(&paragraphs, SUMMARY_HEAD_PARAGRAPHS),
            "last_paragraphs": ts::tail(&paragraphs, SUMMARY_TAIL_PARAGRAPHS),
            "stats": {
                "pages": doc.page_count,
                "words": words,
                "lines": lines.len(),
                "paragraphs": paragraphs.len(),
            },
        }),
        ConversionType::FullContent => {
            let (lines, formatting) = if options.preserve_formatting {
                (ts::raw_lines(text), "preserved")
            } else {
                (lines, "plain")
            };
            json!({
                "text": text,
                "paragraphs": paragraphs,
                "lines": lines,
                "formatting": formatting,
            })
        }
        ConversionType::MetadataOnly => json!({
            "structure": {
                "type": "PDF",
                "pages": doc.page_count,
                "has_text": !text.trim().is_empty(),
                "estimated_reading_time": ts::reading_time_minutes(words),
            }
        }),
    };

    Extracted {
        metadata,
        content: into_map(content),
    }
}
