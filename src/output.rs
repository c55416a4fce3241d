//! Output types: the envelope produced for every conversion.

use crate::config::ConversionType;
use crate::estimate::TokenEstimate;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// The normalised result of converting one file.
///
/// `metadata` and `content` are always present. Their keys depend on the
/// format (and, for `content`, on the conversion mode); there is no global
/// schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedContent {
    /// Lower-cased format tag (`pdf`, `docx`, `txt`, `md`, `csv`, `json`,
    /// `xml` or the image extension).
    pub document_type: String,

    /// User-supplied file name. Display only, never used as a path.
    pub filename: String,

    /// Completion time of the conversion.
    #[serde(serialize_with = "serialize_iso8601")]
    pub processed_at: DateTime<Utc>,

    /// Echo of the requested mode.
    pub conversion_type: ConversionType,

    /// Format-specific descriptive fields. Identical across modes.
    pub metadata: Map<String, Value>,

    /// Format- and mode-specific content fields.
    pub content: Map<String, Value>,
}

impl ProcessedContent {
    /// The envelope as a JSON value, as handed to the size estimator and the
    /// record store.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Millisecond-precision RFC 3339 with a `Z` suffix, e.g.
/// `2024-05-01T12:00:00.000Z`.
fn serialize_iso8601<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// An envelope plus its size estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub processed: ProcessedContent,
    pub estimate: TokenEstimate,
}
