//! Error types for the doc2json library.
//!
//! [`ConvertError`] is the only error type. A conversion either returns a
//! complete [`crate::output::ProcessedContent`] or one of these variants;
//! extractors never hand back a half-built envelope.
//!
//! Token estimation has no error path: degenerate input estimates to `0`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc2json library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Dispatch errors ───────────────────────────────────────────────────
    /// The declared type tag matches no known extractor.
    ///
    /// Raised before the file system is touched.
    #[error("Unsupported file type: '{tag}'")]
    UnsupportedFormat { tag: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The format parser rejected the content (malformed PDF/DOCX, invalid
    /// JSON syntax, unreadable CSV record) or the file could not be read.
    #[error("Failed to process {format} file: {detail}")]
    ExtractionFailure { format: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation or option parsing failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (a blocking task panicked, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Shorthand for an [`ConvertError::ExtractionFailure`] tagged with the
    /// upper-cased format name.
    pub fn extraction(format: &str, detail: impl std::fmt::Display) -> Self {
        ConvertError::ExtractionFailure {
            format: format.to_ascii_uppercase(),
            detail: detail.to_string(),
        }
    }

    /// True for failures caused by the input itself rather than by the
    /// environment or configuration.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ConvertError::UnsupportedFormat { .. } | ConvertError::ExtractionFailure { .. }
        )
    }
}
