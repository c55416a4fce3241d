//! DOCX extraction: paragraph text, an HTML rendering and core properties.
//!
//! A `.docx` file is a zip container. The body lives in `word/document.xml`
//! and the document properties in `docProps/core.xml`. Both are read with
//! `quick-xml` in streaming mode; only the elements that carry text or
//! paragraph/run styling are interpreted.
//!
//! | Element      | Effect                                    |
//! |--------------|-------------------------------------------|
//! | `w:p`        | paragraph boundary                        |
//! | `w:pStyle`   | paragraph style (`Heading1`..`Heading6`, `Title`) |
//! | `w:r`        | run boundary                              |
//! | `w:b`, `w:i` | bold / italic run                         |
//! | `w:t`        | text                                      |
//! | `w:tab`      | tab character                             |
//! | `w:br`, `w:cr` | line break                              |

use crate::config::{ConversionOptions, ConversionType};
use crate::error::ConvertError;
use crate::pipeline::input::{self, FileStats};
use crate::pipeline::text_stats::{self as ts, SUMMARY_HEAD_PARAGRAPHS, SUMMARY_TAIL_PARAGRAPHS};
use crate::pipeline::{insert_opt, into_map, Extracted};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{json, Value};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

const FORMAT: &str = "docx";
const BODY_PART: &str = "word/document.xml";
const CORE_PROPERTIES_PART: &str = "docProps/core.xml";

/// Paragraph styles that render as something other than `<p>`.
fn style_tag(style: &str) -> Option<&'static str> {
    match style {
        "Heading1" | "Title" => Some("h1"),
        "Heading2" => Some("h2"),
        "Heading3" => Some("h3"),
        "Heading4" => Some("h4"),
        "Heading5" => Some("h5"),
        "Heading6" => Some("h6"),
        _ => None,
    }
}

/// Styles that render as `<p>` without a warning.
const PLAIN_STYLES: &[&str] = &["Normal", "BodyText", "ListParagraph", "NoSpacing"];

#[derive(Debug, Clone, Default, PartialEq)]
struct Run {
    text: String,
    bold: bool,
    italic: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Paragraph {
    style: Option<String>,
    runs: Vec<Run>,
}

impl Paragraph {
    fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Core document properties (`docProps/core.xml`) that are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// Everything read out of the DOCX, before mode-specific shaping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocxDocument {
    /// Plain text, one blank line after every paragraph.
    pub text: String,
    /// HTML rendering of the body.
    pub html: String,
    /// Conversion warnings, deduplicated, in first-seen order.
    pub warnings: Vec<String>,
    pub properties: CoreProperties,
}

pub async fn extract(path: &Path, options: &ConversionOptions) -> Result<Extracted, ConvertError> {
    let stats = input::file_stats(path, FORMAT).await?;
    let bytes = input::read_bytes(path, FORMAT).await?;

    let doc = tokio::task::spawn_blocking(move || parse_docx(&bytes))
        .await
        .map_err(|e| ConvertError::Internal(format!("DOCX parse task panicked: {e}")))??;
    debug!(
        "DOCX parsed: {} chars of text, {} warnings",
        doc.text.len(),
        doc.warnings.len()
    );

    Ok(build(&doc, &stats, options))
}

/// Open the zip container and read the body and core properties.
pub fn parse_docx(bytes: &[u8]) -> Result<DocxDocument, ConvertError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ConvertError::extraction(FORMAT, e))?;

    let body = read_part(&mut archive, BODY_PART)?
        .ok_or_else(|| ConvertError::extraction(FORMAT, format!("missing {BODY_PART}")))?;
    let paragraphs = parse_body(&body)?;

    let properties = match read_part(&mut archive, CORE_PROPERTIES_PART)? {
        Some(xml) => parse_core_properties(&xml),
        None => CoreProperties::default(),
    };

    let mut text = String::new();
    for p in &paragraphs {
        text.push_str(&p.text());
        text.push_str("\n\n");
    }

    let (html, warnings) = render_html(&paragraphs);

    Ok(DocxDocument {
        text,
        html,
        warnings,
        properties,
    })
}

fn read_part(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, ConvertError> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ConvertError::extraction(FORMAT, e)),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| ConvertError::extraction(FORMAT, format!("{name}: {e}")))?;
    Ok(Some(xml))
}

/// Value of the `w:val` attribute, if any.
fn val_attr(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"w:val")
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// `<w:b/>` is on; `<w:b w:val="0"/>` and `<w:b w:val="false"/>` are off.
fn toggle_on(e: &BytesStart<'_>) -> bool {
    !matches!(val_attr(e).as_deref(), Some("0") | Some("false") | Some("off"))
}

/// Paragraphs in the order they close. A paragraph nested inside a run (text
/// boxes, alternate content) is emitted before the paragraph that holds it.
fn parse_body(xml: &str) -> Result<Vec<Paragraph>, ConvertError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut paragraphs = Vec::new();
    let mut open_paragraphs: Vec<Paragraph> = Vec::new();
    let mut open_runs: Vec<Run> = Vec::new();
    let mut in_text = false;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| ConvertError::extraction(FORMAT, format!("{BODY_PART}: {e}")))?
        {
            Event::Start(ref e) => match e.name().as_ref() {
                b"w:p" => open_paragraphs.push(Paragraph::default()),
                b"w:r" => open_runs.push(Run::default()),
                b"w:t" => in_text = true,
                b"w:pStyle" => set_style(open_paragraphs.last_mut(), e),
                b"w:b" => set_bold(open_runs.last_mut(), e),
                b"w:i" => set_italic(open_runs.last_mut(), e),
                _ => {}
            },
            Event::Empty(ref e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(Paragraph::default()),
                b"w:pStyle" => set_style(open_paragraphs.last_mut(), e),
                b"w:b" => set_bold(open_runs.last_mut(), e),
                b"w:i" => set_italic(open_runs.last_mut(), e),
                b"w:tab" => push_text(open_runs.last_mut(), "\t"),
                b"w:br" | b"w:cr" => push_text(open_runs.last_mut(), "\n"),
                _ => {}
            },
            Event::Text(ref e) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|err| ConvertError::extraction(FORMAT, format!("{BODY_PART}: {err}")))?;
                push_text(open_runs.last_mut(), &text);
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:r" => {
                    if let (Some(r), Some(p)) = (open_runs.pop(), open_paragraphs.last_mut()) {
                        p.runs.push(r);
                    }
                }
                b"w:p" => {
                    if let Some(p) = open_paragraphs.pop() {
                        paragraphs.push(p);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn set_style(paragraph: Option<&mut Paragraph>, e: &BytesStart<'_>) {
    if let Some(p) = paragraph {
        p.style = val_attr(e);
    }
}

fn set_bold(run: Option<&mut Run>, e: &BytesStart<'_>) {
    if let Some(r) = run {
        r.bold = toggle_on(e);
    }
}

fn set_italic(run: Option<&mut Run>, e: &BytesStart<'_>) {
    if let Some(r) = run {
        r.italic = toggle_on(e);
    }
}

fn push_text(run: Option<&mut Run>, text: &str) {
    if let Some(r) = run {
        r.text.push_str(text);
    }
}

/// Render paragraphs as HTML. Empty paragraphs are dropped; unknown
/// paragraph styles fall back to `<p>` with a warning.
fn render_html(paragraphs: &[Paragraph]) -> (String, Vec<String>) {
    let mut html = String::new();
    let mut warnings: Vec<String> = Vec::new();

    for p in paragraphs {
        let tag = match p.style.as_deref() {
            Some(style) => style_tag(style).unwrap_or_else(|| {
                if !PLAIN_STYLES.contains(&style) {
                    let warning = format!("Unrecognised paragraph style: '{style}'");
                    if !warnings.contains(&warning) {
                        warnings.push(warning);
                    }
                }
                "p"
            }),
            None => "p",
        };

        if p.text().trim().is_empty() {
            continue;
        }

        html.push('<');
        html.push_str(tag);
        html.push('>');
        for run in &p.runs {
            let mut inner = escape(run.text.as_str()).replace('\n', "<br />");
            if run.italic {
                inner = format!("<em>{inner}</em>");
            }
            if run.bold {
                inner = format!("<strong>{inner}</strong>");
            }
            html.push_str(&inner);
        }
        html.push_str("</");
        html.push_str(tag);
        html.push('>');
    }

    (html, warnings)
}

/// Read the Dublin Core properties. Malformed XML yields whatever was read
/// before the error.
fn parse_core_properties(xml: &str) -> CoreProperties {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut props = CoreProperties::default();
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                current = String::from_utf8_lossy(e.name().as_ref()).into_owned();
            }
            Ok(Event::End(_)) => current.clear(),
            Ok(Event::Text(e)) => {
                let text = e.unescape().map(|t| t.trim().to_string()).unwrap_or_default();
                let slot = match current.as_str() {
                    "dc:title" => Some(&mut props.title),
                    "dc:creator" => Some(&mut props.author),
                    "dc:subject" => Some(&mut props.subject),
                    "dc:description" => Some(&mut props.description),
                    "dcterms:created" => Some(&mut props.created),
                    "dcterms:modified" => Some(&mut props.modified),
                    _ => None,
                };
                if let Some(slot) = slot {
                    if !text.is_empty() {
                        *slot = Some(text);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    props
}

/// Shape the parsed document into metadata and mode-specific content.
pub fn build(doc: &DocxDocument, stats: &FileStats, options: &ConversionOptions) -> Extracted {
    let text = doc.text.as_str();
    let words = ts::word_count(text);
    let paragraphs = ts::paragraphs(text);
    let lines = ts::trimmed_lines(text);
    let has_formatting =
        options.preserve_formatting && ts::char_count(&doc.html) > ts::char_count(text);

    let mut metadata = into_map(json!({
        "file_size": stats.size,
        "word_count": words,
        "char_count": ts::char_count(text),
        "line_count": lines.len(),
        "creation_date": stats.created_iso(),
        "has_formatting": has_formatting,
    }));
    if !doc.warnings.is_empty() {
        metadata.insert("warnings".into(), json!(doc.warnings));
    }
    let props = &doc.properties;
    insert_opt(&mut metadata, "title", props.title.clone());
    insert_opt(&mut metadata, "author", props.author.clone());
    insert_opt(&mut metadata, "subject", props.subject.clone());
    insert_opt(&mut metadata, "description", props.description.clone());
    insert_opt(&mut metadata, "document_created", props.created.clone());
    insert_opt(&mut metadata, "document_modified", props.modified.clone());

    let content = match options.conversion_type {
        ConversionType::Summary => json!({
            "description": format!(
                "Word document with {} words and {} paragraphs",
                words,
                paragraphs.len()
            ),
            "first_paragraphs": ts::head(&paragraphs, SUMMARY_HEAD_PARAGRAPHS),
            "last_paragraphs": ts::tail(&paragraphs, SUMMARY_TAIL_PARAGRAPHS),
            "potential_headings": ts::potential_headings(&lines),
            "stats": {
                "words": words,
                "paragraphs": paragraphs.len(),
                "lines": lines.len(),
                "estimated_pages": ts::estimated_pages(words),
            },
        }),
        ConversionType::FullContent => {
            let formatting = if options.preserve_formatting {
                "preserved"
            } else {
                "plain"
            };
            let mut full = into_map(json!({
                "text": text,
                "paragraphs": paragraphs,
                "lines": lines,
                "formatting": formatting,
            }));
            if options.preserve_formatting {
                full.insert("html".into(), Value::String(doc.html.clone()));
            }
            Value::Object(full)
        }
        ConversionType::MetadataOnly => json!({
            "structure": {
                "type": "DOCX",
                "has_text": !text.trim().is_empty(),
                "estimated_reading_time": ts::reading_time_minutes(words),
                "estimated_pages": ts::estimated_pages(words),
            }
        }),
    };

    Extracted {
        metadata,
        content: into_map(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::io::Write;

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Project Plan</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">We ship in </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>Q3 &amp; Q4</w:t></w:r><w:r><w:t>.</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:pPr><w:pStyle w:val="Quote"/></w:pPr><w:r><w:t>Tabs</w:t><w:tab/><w:t>here</w:t></w:r></w:p>
    <w:p><w:pPr><w:pStyle w:val="Quote"/></w:pPr><w:r><w:rPr><w:i/><w:b w:val="0"/></w:rPr><w:t>Again</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    const CORE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
  <dc:title>Plan</dc:title>
  <dc:creator>Jordan</dc:creator>
  <dcterms:created>2024-01-02T03:04:05Z</dcterms:created>
</cp:coreProperties>"#;

    fn make_docx(body: &str, core: Option<&str>) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let opts = zip::write::FileOptions::default();
            zip.start_file(BODY_PART, opts).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
            if let Some(core) = core {
                zip.start_file(CORE_PROPERTIES_PART, opts).unwrap();
                zip.write_all(core.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    fn stats() -> FileStats {
        FileStats {
            size: 4096,
            created: Utc::now(),
        }
    }

    #[test]
    fn parses_text_runs_and_breaks() {
        let doc = parse_docx(&make_docx(BODY, None)).unwrap();
        assert_eq!(
            doc.text,
            "Project Plan\n\nWe ship in Q3 & Q4.\n\n\n\nTabs\there\n\nAgain\n\n"
        );
    }

    #[test]
    fn renders_html_with_headings_and_runs() {
        let doc = parse_docx(&make_docx(BODY, None)).unwrap();
        assert_eq!(
            doc.html,
            "<h1>Project Plan</h1><p>We ship in <strong>Q3 &amp; Q4</strong>.</p>\
             <p>Tabs\there</p><p><em>Again</em></p>"
        );
    }

    #[test]
    fn text_box_paragraph_keeps_surrounding_runs() {
        let body = format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            "<w:p><w:r><w:t>Before box.</w:t></w:r><w:r><w:pict><w:txbxContent><w:p><w:r><w:t>Inside</w:t></w:r></w:p></w:txbxContent></w:pict></w:r><w:r><w:t>After box.</w:t></w:r></w:p>"
        );
        let doc = parse_docx(&make_docx(&body, None)).unwrap();
        assert_eq!(doc.text, "Inside\n\nBefore box.After box.\n\n");
        assert_eq!(doc.html, "<p>Inside</p><p>Before box.After box.</p>");
    }

    #[test]
    fn html_escapes_markup_characters() {
        let body = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>a &lt;b&gt; "c"</w:t></w:r></w:p></w:body></w:document>"#;
        let doc = parse_docx(&make_docx(body, None)).unwrap();
        assert_eq!(doc.html, "<p>a &lt;b&gt; &quot;c&quot;</p>");
    }

    #[test]
    fn unknown_styles_warn_once() {
        let doc = parse_docx(&make_docx(BODY, None)).unwrap();
        assert_eq!(doc.warnings, vec!["Unrecognised paragraph style: 'Quote'"]);
    }

    #[test]
    fn reads_core_properties() {
        let doc = parse_docx(&make_docx(BODY, Some(CORE))).unwrap();
        assert_eq!(doc.properties.title.as_deref(), Some("Plan"));
        assert_eq!(doc.properties.author.as_deref(), Some("Jordan"));
        assert_eq!(doc.properties.created.as_deref(), Some("2024-01-02T03:04:05Z"));
        assert_eq!(doc.properties.subject, None);
    }

    #[test]
    fn not_a_zip_is_extraction_failure() {
        let err = parse_docx(b"plain text").unwrap_err();
        assert!(err.to_string().contains("DOCX"), "got: {err}");
    }

    #[test]
    fn missing_body_is_extraction_failure() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("other.xml", zip::write::FileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = parse_docx(&buf).unwrap_err();
        assert!(err.to_string().contains(BODY_PART), "got: {err}");
    }

    #[test]
    fn has_formatting_requires_preserve_flag() {
        let doc = parse_docx(&make_docx(BODY, None)).unwrap();
        let plain = build(&doc, &stats(), &ConversionOptions::default());
        assert_eq!(plain.metadata["has_formatting"], false);

        let preserve = ConversionOptions::builder().preserve_formatting(true).build();
        let out = build(&doc, &stats(), &preserve);
        assert_eq!(out.metadata["has_formatting"], true);
        assert_eq!(out.metadata["warnings"][0], "Unrecognised paragraph style: 'Quote'");
    }

    #[test]
    fn summary_lists_potential_headings() {
        let doc = parse_docx(&make_docx(BODY, None)).unwrap();
        let out = build(&doc, &stats(), &ConversionOptions::default());
        let headings = out.content["potential_headings"].as_array().unwrap();
        assert!(headings.contains(&json!("Project Plan")));
        assert!(!headings.contains(&json!("We ship in Q3 & Q4.")));
        assert_eq!(out.content["stats"]["estimated_pages"], 1);
    }

    #[test]
    fn full_content_html_only_when_preserving() {
        let doc = parse_docx(&make_docx(BODY, None)).unwrap();
        let full = ConversionOptions::builder()
            .conversion_type(ConversionType::FullContent)
            .build();
        let out = build(&doc, &stats(), &full);
        assert!(!out.content.contains_key("html"));
        assert_eq!(out.content["formatting"], "plain");

        let full_fmt = ConversionOptions::builder()
            .conversion_type(ConversionType::FullContent)
            .preserve_formatting(true)
            .build();
        let out = build(&doc, &stats(), &full_fmt);
        assert!(out.content["html"].as_str().unwrap().starts_with("<h1>"));
    }

    #[test]
    fn metadata_only_structure() {
        let doc = DocxDocument::default();
        let opts = ConversionOptions::builder()
            .conversion_type(ConversionType::MetadataOnly)
            .build();
        let out = build(&doc, &stats(), &opts);
        let s = &out.content["structure"];
        assert_eq!(s["type"], "DOCX");
        assert_eq!(s["has_text"], false);
        assert_eq!(s["estimated_reading_time"], 0);
        assert_eq!(s["estimated_pages"], 0);
    }
}
