//! Plain text and Markdown extraction.
//!
//! Both are read whole, CRLF is folded to LF and the result is described by
//! its lines. Markdown gets no rendering; its ATX headings are only counted.

use crate::config::{ConversionOptions, ConversionType};
use crate::error::ConvertError;
use crate::pipeline::input::{self, FileStats};
use crate::pipeline::text_stats as ts;
use crate::pipeline::Extracted;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::debug;

/// Non-blank lines sampled from each end in `summary` mode.
pub const SUMMARY_LINES: usize = 5;

static RE_ATX_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s{0,3}#{1,6}(\s|$)").unwrap());

/// Which flavour of text file is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Plain,
    Markdown,
}

impl TextKind {
    fn tag(self) -> &'static str {
        match self {
            TextKind::Plain => "txt",
            TextKind::Markdown => "md",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            TextKind::Plain => "Text file",
            TextKind::Markdown => "Markdown document",
        }
    }
}

pub async fn extract(
    path: &Path,
    kind: TextKind,
    options: &ConversionOptions,
) -> Result<Extracted, ConvertError> {
    let stats = input::file_stats(path, kind.tag()).await?;
    let raw = input::read_text(path, kind.tag()).await?;
    let text = normalize_newlines(&raw);
    debug!("{} read: {} bytes", kind.noun(), text.len());
    Ok(build(&text, kind, &stats, options))
}

/// Fold `\r\n` and lone `\r` into `\n`.
pub fn normalize_newlines(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Count ATX (`# Title`) headings.
pub fn heading_count(text: &str) -> usize {
    text.lines().filter(|l| RE_ATX_HEADING.is_match(l)).count()
}

pub fn build(text: &str, kind: TextKind, stats: &FileStats, options: &ConversionOptions) -> Extracted {
    let lines = ts::raw_lines(text);
    let words = ts::word_count(text);

    let metadata = json!({
        "file_size": stats.size,
        "line_count": lines.len(),
        "word_count": words,
        "char_count": ts::char_count(text),
    });

    let content = match options.conversion_type {
        ConversionType::Summary => {
            let non_blank = ts::trimmed_lines(text);
            json!({
                "description": format!(
                    "{} with {} lines and {} words",
                    kind.noun(),
                    lines.len(),
                    words
                ),
                "first_lines": ts::head(&non_blank, SUMMARY_LINES),
                "last_lines": ts::tail(&non_blank, SUMMARY_LINES),
            })
        }
        ConversionType::FullContent => json!({
            "text": text,
            "lines": lines,
        }),
        ConversionType::MetadataOnly => {
            let mut structure = Map::new();
            structure.insert(
                "type".into(),
                Value::from(match kind {
                    TextKind::Plain => "TEXT",
                    TextKind::Markdown => "MARKDOWN",
                }),
            );
            structure.insert("has_text".into(), Value::from(!text.trim().is_empty()));
            structure.insert("line_count".into(), Value::from(lines.len()));
            structure.insert(
                "estimated_reading_time".into(),
                Value::from(ts::reading_time_minutes(words)),
            );
            if kind == TextKind::Markdown {
                structure.insert("heading_count".into(), Value::from(heading_count(text)));
            }
            json!({ "structure": structure })
        }
    };

    Extracted::new(metadata, content)
}
