//! JSON extraction.
//!
//! The document is parsed with `serde_json` and described by its top-level
//! shape. `full_content` hands the parsed value back untouched; key order is
//! kept because the crate enables `preserve_order`.

use crate::config::{ConversionOptions, ConversionType};
use crate::error::ConvertError;
use crate::pipeline::input::{self, FileStats};
use crate::pipeline::Extracted;
use serde_json::{json, Map, Value};
use std::path::Path;

const FORMAT: &str = "json";

/// Top-level keys listed in `summary` and `metadata_only`.
pub const MAX_TOP_LEVEL_KEYS: usize = 10;

/// Array items sampled in `summary` mode.
pub const SAMPLE_ITEMS: usize = 3;

pub async fn extract(path: &Path, options: &ConversionOptions) -> Result<Extracted, ConvertError> {
    let stats = input::file_stats(path, FORMAT).await?;
    let text = input::read_text(path, FORMAT).await?;
    let value = parse(&text)?;
    Ok(build(&value, &stats, options))
}

pub fn parse(text: &str) -> Result<Value, ConvertError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    serde_json::from_str(text).map_err(|e| ConvertError::extraction(FORMAT, e))
}

/// Nesting depth: scalars are 0, a container is one more than its deepest
/// child.
pub fn depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

fn top_level_keys(map: &Map<String, Value>) -> Vec<&String> {
    map.keys().take(MAX_TOP_LEVEL_KEYS).collect()
}

pub fn build(value: &Value, stats: &FileStats, options: &ConversionOptions) -> Extracted {
    // Anything that is not an array is described as an object; scalars
    // simply have no keys.
    let empty = Map::new();
    let (is_array, count, object) = match value {
        Value::Array(items) => (true, items.len(), &empty),
        Value::Object(map) => (false, map.len(), map),
        _ => (false, 0, &empty),
    };

    let metadata = if is_array {
        json!({
            "file_size": stats.size,
            "structure_type": "array",
            "item_count": count,
        })
    } else {
        json!({
            "file_size": stats.size,
            "structure_type": "object",
            "key_count": count,
        })
    };

    let content = match options.conversion_type {
        ConversionType::Summary => {
            if let Value::Array(items) = value {
                json!({
                    "description": format!("JSON array with {count} items"),
                    "top_level_keys": [format!("Array with {count} items")],
                    "sample": &items[..items.len().min(SAMPLE_ITEMS)],
                })
            } else {
                json!({
                    "description": format!("JSON object with {count} keys"),
                    "top_level_keys": top_level_keys(object),
                    "sample": value,
                })
            }
        }
        ConversionType::FullContent => json!({ "data": value }),
        ConversionType::MetadataOnly => {
            if is_array {
                json!({
                    "structure": {
                        "type": "JSON",
                        "structure_type": "array",
                        "item_count": count,
                        "depth": depth(value),
                    }
                })
            } else {
                json!({
                    "structure": {
                        "type": "JSON",
                        "structure_type": "object",
                        "top_level_keys": top_level_keys(object),
                        "depth": depth(value),
                    }
                })
            }
        }
    };

    Extracted::new(metadata, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stats() -> FileStats {
        FileStats {
            size: 10,
            created: Utc::now(),
        }
    }

    fn options(t: ConversionType) -> ConversionOptions {
        ConversionOptions::builder().conversion_type(t).build()
    }

    #[test]
    fn full_content_is_lossless() {
        let src = r#"{"z": 1, "a": [1.5, null, {"k": "v"}], "m": {"deep": true}}"#;
        let value = parse(src).unwrap();
        let out = build(&value, &stats(), &options(ConversionType::FullContent));
        assert_eq!(out.content["data"], value);
        let keys: Vec<&String> = out.content["data"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn array_summary_uses_placeholder_and_samples() {
        let value = json!([1, 2, 3, 4, 5]);
        let out = build(&value, &stats(), &options(ConversionType::Summary));
        assert_eq!(out.metadata["structure_type"], "array");
        assert_eq!(out.metadata["item_count"], 5);
        assert_eq!(out.content["top_level_keys"], json!(["Array with 5 items"]));
        assert_eq!(out.content["sample"], json!([1, 2, 3]));
    }

    #[test]
    fn object_summary_caps_keys() {
        let map: Map<String, Value> = (0..15).map(|i| (format!("k{i}"), json!(i))).collect();
        let value = Value::Object(map);
        let out = build(&value, &stats(), &options(ConversionType::Summary));
        assert_eq!(out.metadata["key_count"], 15);
        assert_eq!(out.content["top_level_keys"].as_array().unwrap().len(), 10);
        assert_eq!(out.content["sample"], value);
    }

    #[test]
    fn metadata_only_reports_depth() {
        let value = json!({"a": {"b": [1]}});
        let out = build(&value, &stats(), &options(ConversionType::MetadataOnly));
        let s = &out.content["structure"];
        assert_eq!(s["type"], "JSON");
        assert_eq!(s["depth"], 3);
        assert_eq!(s["top_level_keys"], json!(["a"]));
        assert_eq!(depth(&json!(7)), 0);
        assert_eq!(depth(&json!([])), 1);
    }

    #[test]
    fn invalid_json_is_extraction_failure() {
        let err = parse("{not json").unwrap_err();
        assert!(err.to_string().starts_with("Failed to process JSON file"));
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        assert_eq!(parse("\u{feff}[1]").unwrap(), json!([1]));
    }
}
