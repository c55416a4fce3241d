//! # doc2json
//!
//! Convert uploaded documents into a normalised JSON envelope, sized for a
//! token-limited language-model consumer.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file + type tag
//!  │
//!  ├─ 1. Dispatch  tag → DocumentFormat (unknown tags fail before any I/O)
//!  ├─ 2. Extract   one strategy per format: pdf, docx, txt/md, csv, json, xml, image
//!  ├─ 3. Envelope  document_type, filename, processed_at, mode, metadata, content
//!  └─ 4. Estimate  heuristic token count, cost and context-window share
//! ```
//!
//! Three modes control how much `content` is emitted: `summary`,
//! `full_content` and `metadata_only`. The `metadata` map is the same in
//! every mode.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2json::{process_with_estimate, ConversionOptions, ConversionType, EstimatorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ConversionOptions::builder()
//!         .conversion_type(ConversionType::FullContent)
//!         .build();
//!     let out = process_with_estimate(
//!         "report.pdf",
//!         "report.pdf",
//!         "pdf",
//!         &options,
//!         &EstimatorConfig::default(),
//!     )
//!     .await?;
//!     println!("{}", serde_json::to_string_pretty(&out.processed)?);
//!     eprintln!("~{} tokens", out.estimate.tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Token Estimates
//!
//! The estimator is a heuristic, not a tokenizer: it averages a
//! character-based and a word-based guess over the flattened JSON text. See
//! [`estimate`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2json` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc2json = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod estimate;
pub mod format;
pub mod job;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionOptions, ConversionOptionsBuilder, ConversionType, EstimatorConfig,
    EstimatorConfigBuilder,
};
pub use convert::{process, process_bytes, process_sync, process_to_file, process_with_estimate};
pub use error::ConvertError;
pub use estimate::{
    context_percentage, estimate_cost, estimate_text_tokens, estimate_tokens, TokenEstimate,
};
pub use format::{DocumentFormat, ImageFormat};
pub use job::{
    spawn_conversion, ConversionId, ConversionJob, ConversionRecord, ConversionRequest,
    ConversionStatus, MemoryRecordStore, RecordStore,
};
pub use output::{ConversionOutput, ProcessedContent};
