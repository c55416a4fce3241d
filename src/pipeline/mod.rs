//! Per-format extraction strategies.
//!
//! Each submodule reads one file format and returns an [`Extracted`] pair of
//! `metadata` and `content` maps. The dispatcher in [`crate::convert`] picks
//! the strategy and wraps the pair into the envelope.
//!
//! ## Data Flow
//!
//! ```text
//! path ──▶ input ──▶ <format> ──▶ Extracted ──▶ convert (envelope)
//!          (bytes,    (parse,
//!           stats)     modes)
//! ```
//!
//! 1. [`input`]: read bytes or open a stream, collect file stats
//! 2. [`text_stats`]: shared counting, sampling and heading heuristics
//! 3. one module per format: [`pdf`], [`docx`], [`text`], [`csv`],
//!    [`json`], [`xml`], [`image`]
//!
//! Strategies are leaves: they build both maps locally and only return them
//! once complete. Any failure surfaces as
//! [`crate::error::ConvertError::ExtractionFailure`].

pub mod csv;
pub mod docx;
pub mod image;
pub mod input;
pub mod json;
pub mod pdf;
pub mod text;
pub mod text_stats;
pub mod xml;

use serde_json::{Map, Value};

/// The output of one extractor strategy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub metadata: Map<String, Value>,
    pub content: Map<String, Value>,
}

impl Extracted {
    pub fn new(metadata: Value, content: Value) -> Self {
        Self {
            metadata: into_map(metadata),
            content: into_map(content),
        }
    }
}

/// Unwrap a `json!({...})` literal into its map. Non-objects become empty.
pub(crate) fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Insert `key` only when `value` is `Some`.
pub(crate) fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(v) = value {
        map.insert(key.to_string(), Value::String(v));
    }
}
