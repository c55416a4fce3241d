//! XML extraction by tag scanning.
//!
//! Opening tags are found with a regex rather than a parser, so malformed
//! markup never fails the conversion. Closing tags, comments, processing
//! instructions and declarations do not match the tag pattern.

use crate::config::{ConversionOptions, ConversionType};
use crate::error::ConvertError;
use crate::pipeline::input::{self, FileStats};
use crate::pipeline::Extracted;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::path::Path;

const FORMAT: &str = "xml";

/// Unique tags listed in metadata.
pub const SAMPLE_TAGS: usize = 5;

/// Characters of raw XML shown in `summary` mode.
pub const PREVIEW_CHARS: usize = 500;

const FULL_CONTENT_NOTE: &str =
    "Raw XML content is provided as-is; structural parsing is not performed";

static RE_OPENING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z_][\w:.-]*)[^>]*>").unwrap());

/// Tag names found by scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagScan {
    /// Number of opening (and self-closing) tags.
    pub tag_count: usize,
    /// Distinct tag names in order of first appearance.
    pub unique_tags: Vec<String>,
}

impl TagScan {
    pub fn root_element(&self) -> Option<&str> {
        self.unique_tags.first().map(String::as_str)
    }
}

pub async fn extract(path: &Path, options: &ConversionOptions) -> Result<Extracted, ConvertError> {
    let stats = input::file_stats(path, FORMAT).await?;
    let text = input::read_text(path, FORMAT).await?;
    Ok(build(&text, &stats, options))
}

pub fn scan_tags(xml: &str) -> TagScan {
    let mut scan = TagScan::default();
    for caps in RE_OPENING_TAG.captures_iter(xml) {
        scan.tag_count += 1;
        let name = &caps[1];
        if !scan.unique_tags.iter().any(|t| t == name) {
            scan.unique_tags.push(name.to_string());
        }
    }
    scan
}

fn preview(xml: &str) -> String {
    xml.chars().take(PREVIEW_CHARS).collect()
}

pub fn build(xml: &str, stats: &FileStats, options: &ConversionOptions) -> Extracted {
    let scan = scan_tags(xml);
    let unique = scan.unique_tags.len();

    let metadata = json!({
        "file_size": stats.size,
        "tag_count": scan.tag_count,
        "unique_tag_count": unique,
        "sample_tags": &scan.unique_tags[..unique.min(SAMPLE_TAGS)],
    });

    let content = match options.conversion_type {
        ConversionType::Summary => json!({
            "description": format!(
                "XML document with {} elements and {} unique tags",
                scan.tag_count, unique
            ),
            "unique_tags": scan.unique_tags,
            "preview": preview(xml),
        }),
        ConversionType::FullContent => json!({
            "raw_xml": xml,
            "note": FULL_CONTENT_NOTE,
        }),
        ConversionType::MetadataOnly => json!({
            "structure": {
                "type": "XML",
                "unique_tags": scan.unique_tags,
                "root_element": scan.root_element(),
            }
        }),
    };

    Extracted::new(metadata, content)
}
