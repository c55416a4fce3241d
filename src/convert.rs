//! Conversion entry points.
//!
//! [`process`] is the dispatcher: it resolves the declared type tag to a
//! [`DocumentFormat`], runs the matching extractor and wraps the result in a
//! [`ProcessedContent`] envelope. It is also the error boundary. Unknown tags
//! fail with [`ConvertError::UnsupportedFormat`] before any file-system
//! access, and every extractor failure surfaces as
//! [`ConvertError::ExtractionFailure`] with no partial envelope.

use crate::config::{ConversionOptions, EstimatorConfig};
use crate::error::ConvertError;
use crate::estimate::TokenEstimate;
use crate::format::DocumentFormat;
use crate::output::{ConversionOutput, ProcessedContent};
use crate::pipeline::text::TextKind;
use crate::pipeline::{csv, docx, image, json, pdf, text, xml, Extracted};
use chrono::Utc;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert the file at `path` into a [`ProcessedContent`] envelope.
///
/// # Arguments
/// * `path` - Location of the uploaded bytes
/// * `original_filename` - User-supplied name, echoed into the envelope only
/// * `type_tag` - Declared format tag, e.g. `pdf` or `csv` (case-insensitive)
/// * `options` - Conversion mode and advisory flags
///
/// # Errors
/// - [`ConvertError::UnsupportedFormat`] for an unknown tag
/// - [`ConvertError::ExtractionFailure`] when the file cannot be read or
///   parsed as the declared format
pub async fn process(
    path: impl AsRef<Path>,
    original_filename: &str,
    type_tag: &str,
    options: &ConversionOptions,
) -> Result<ProcessedContent, ConvertError> {
    let format: DocumentFormat = type_tag.parse()?;
    let path = path.as_ref();
    let start = Instant::now();
    info!(
        "Converting '{}' as {} ({})",
        original_filename,
        format.display_name(),
        options.conversion_type
    );
    debug!(
        "Options: include_tables={} include_images={} preserve_formatting={}",
        options.include_tables, options.include_images, options.preserve_formatting
    );

    let Extracted { metadata, content } = extract(format, path, options).await?;

    let processed = ProcessedContent {
        document_type: format.tag().to_string(),
        filename: original_filename.to_string(),
        processed_at: Utc::now(),
        conversion_type: options.conversion_type,
        metadata,
        content,
    };
    info!(
        "Converted '{}' in {}ms",
        original_filename,
        start.elapsed().as_millis()
    );
    Ok(processed)
}

async fn extract(
    format: DocumentFormat,
    path: &Path,
    options: &ConversionOptions,
) -> Result<Extracted, ConvertError> {
    match format {
        DocumentFormat::Pdf => pdf::extract(path, options).await,
        DocumentFormat::Docx => docx::extract(path, options).await,
        DocumentFormat::Text => text::extract(path, TextKind::Plain, options).await,
        DocumentFormat::Markdown => text::extract(path, TextKind::Markdown, options).await,
        DocumentFormat::Csv => csv::extract(path, options).await,
        DocumentFormat::Json => json::extract(path, options).await,
        DocumentFormat::Xml => xml::extract(path, options).await,
        DocumentFormat::Image(image_format) => image::extract(path, image_format, options).await,
    }
}

/// [`process`] followed by the size estimate of the whole envelope.
pub async fn process_with_estimate(
    path: impl AsRef<Path>,
    original_filename: &str,
    type_tag: &str,
    options: &ConversionOptions,
    estimator: &EstimatorConfig,
) -> Result<ConversionOutput, ConvertError> {
    let processed = process(path, original_filename, type_tag, options).await?;
    let estimate = TokenEstimate::for_value(&processed.to_value(), estimator);
    debug!(
        "Estimated {} tokens ({:.2}% of context)",
        estimate.tokens, estimate.context_percentage
    );
    Ok(ConversionOutput {
        processed,
        estimate,
    })
}

/// Convert an in-memory upload.
///
/// The bytes are written to a managed [`tempfile`] that is removed when the
/// call returns. An unknown tag is rejected before the temporary file is
/// created.
///
/// # Example
/// ```rust,no_run
/// use doc2json::{process_bytes, ConversionOptions};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("report.csv")?;
/// let out = process_bytes(&bytes, "report.csv", "csv", &ConversionOptions::default()).await?;
/// println!("{}", out.metadata["row_count"]);
/// # Ok(())
/// # }
/// ```
pub async fn process_bytes(
    bytes: &[u8],
    original_filename: &str,
    type_tag: &str,
    options: &ConversionOptions,
) -> Result<ProcessedContent, ConvertError> {
    type_tag.parse::<DocumentFormat>()?;
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| ConvertError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ConvertError::Internal(format!("tempfile write: {e}")))?;
    // `tmp` is deleted when it drops after `process` returns
    process(tmp.path(), original_filename, type_tag, options).await
}

/// Blocking wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally; do not call from inside an
/// async context.
pub fn process_sync(
    path: impl AsRef<Path>,
    original_filename: &str,
    type_tag: &str,
    options: &ConversionOptions,
) -> Result<ProcessedContent, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process(path, original_filename, type_tag, options))
}

/// Convert and write the pretty-printed [`ConversionOutput`] to
/// `output_path`.
///
/// The file is written next to its destination and renamed into place, so
/// readers never observe a partial document.
pub async fn process_to_file(
    path: impl AsRef<Path>,
    original_filename: &str,
    type_tag: &str,
    options: &ConversionOptions,
    estimator: &EstimatorConfig,
    output_path: impl AsRef<Path>,
) -> Result<ConversionOutput, ConvertError> {
    let output =
        process_with_estimate(path, original_filename, type_tag, options, estimator).await?;
    let out_path = output_path.as_ref();
    let write_err = |e: std::io::Error| ConvertError::OutputWriteFailed {
        path: out_path.to_path_buf(),
        source: e,
    };

    let body = serde_json::to_vec_pretty(&output)
        .map_err(|e| ConvertError::Internal(format!("serialise output: {e}")))?;

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = out_path.with_extension("json.tmp");
    let written = match tokio::fs::write(&tmp_path, &body).await {
        Ok(()) => tokio::fs::rename(&tmp_path, out_path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            debug!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(write_err(e));
    }

    info!("Wrote {} bytes to {}", body.len(), out_path.display());
    Ok(output)
}
