//! Input access: read the uploaded file and collect its file-system stats.
//!
//! Every I/O failure is reported as an extraction failure for the format
//! being processed, so callers see `Failed to process CSV file: file not
//! found: ...` rather than a bare OS error.

use crate::error::ConvertError;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

/// File-system facts reported in every format's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    /// Size in bytes.
    pub size: u64,
    /// Creation time, or modification time where the platform does not
    /// record creation.
    pub created: DateTime<Utc>,
}

impl FileStats {
    /// `created` as an ISO-8601 string with millisecond precision.
    pub fn created_iso(&self) -> String {
        self.created
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}

fn io_failure(format: &str, path: &Path, err: std::io::Error) -> ConvertError {
    let detail = match err.kind() {
        ErrorKind::NotFound => format!("file not found: '{}'", path.display()),
        ErrorKind::PermissionDenied => format!("permission denied reading '{}'", path.display()),
        _ => format!("cannot read '{}': {}", path.display(), err),
    };
    ConvertError::extraction(format, detail)
}

/// Stat the file at `path`.
pub async fn file_stats(path: &Path, format: &str) -> Result<FileStats, ConvertError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| io_failure(format, path, e))?;

    let created: SystemTime = meta
        .created()
        .or_else(|_| meta.modified())
        .unwrap_or_else(|_| SystemTime::now());

    Ok(FileStats {
        size: meta.len(),
        created: DateTime::<Utc>::from(created),
    })
}

/// Read the whole file into memory.
pub async fn read_bytes(path: &Path, format: &str) -> Result<Vec<u8>, ConvertError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_failure(format, path, e))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Read the whole file as text, replacing invalid UTF-8 sequences.
pub async fn read_text(path: &Path, format: &str) -> Result<String, ConvertError> {
    let bytes = read_bytes(path, format).await?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Open the file for streaming reads.
pub async fn open(path: &Path, format: &str) -> Result<tokio::fs::File, ConvertError> {
    tokio::fs::File::open(path)
        .await
        .map_err(|e| io_failure(format, path, e))
}
