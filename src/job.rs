//! Background conversion jobs and their records.
//!
//! A job is fire-and-forget: [`spawn_conversion`] stores a record in the
//! `processing` state and returns at once, while a Tokio task runs the
//! conversion and writes the terminal record (`completed` or `error`) back
//! to the [`RecordStore`]. Nothing a conversion does, including panicking,
//! escapes the task.
//!
//! There is no per-file lock. Two jobs for the same upload race and the last
//! terminal write wins.

use crate::config::{ConversionOptions, EstimatorConfig};
use crate::convert::process_with_estimate;
use crate::error::ConvertError;
use crate::output::ProcessedContent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Identifier of a conversion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionId(Uuid);

impl ConversionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Processing,
    Completed,
    Error,
}

impl ConversionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConversionStatus::Processing)
    }
}

/// The persisted state of one conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub id: ConversionId,
    pub filename: String,
    /// Declared type tag, lower-cased.
    pub document_type: String,
    pub status: ConversionStatus,
    /// Set once the conversion completed.
    pub result: Option<ProcessedContent>,
    /// Estimated tokens of `result`.
    pub token_count: Option<u64>,
    /// Human-readable failure message when `status` is `error`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversionRecord {
    fn processing(id: ConversionId, filename: &str, type_tag: &str) -> Self {
        let now = Utc::now();
        Self {
            id,
            filename: filename.to_string(),
            document_type: type_tag.trim().to_ascii_lowercase(),
            status: ConversionStatus::Processing,
            result: None,
            token_count: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn complete(mut self, result: ProcessedContent, token_count: u64) -> Self {
        self.status = ConversionStatus::Completed;
        self.result = Some(result);
        self.token_count = Some(token_count);
        self.error = None;
        self.updated_at = Utc::now();
        self
    }

    fn fail(mut self, message: String) -> Self {
        self.status = ConversionStatus::Error;
        self.result = None;
        self.token_count = None;
        self.error = Some(message);
        self.updated_at = Utc::now();
        self
    }
}

/// Everything a background conversion needs.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Location of the uploaded bytes. Must outlive the job.
    pub path: PathBuf,
    pub filename: String,
    pub type_tag: String,
    pub options: ConversionOptions,
    pub estimator: EstimatorConfig,
}

/// Key-value persistence for conversion records.
///
/// `put` is an upsert: it replaces any record with the same id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put(&self, record: ConversionRecord) -> Result<(), String>;

    async fn get(&self, id: ConversionId) -> Result<Option<ConversionRecord>, String>;

    async fn delete(&self, id: ConversionId) -> Result<bool, String>;
}

/// In-process [`RecordStore`].
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<ConversionId, ConversionRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, record: ConversionRecord) -> Result<(), String> {
        self.records.write().await.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: ConversionId) -> Result<Option<ConversionRecord>, String> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn delete(&self, id: ConversionId) -> Result<bool, String> {
        Ok(self.records.write().await.remove(&id).is_some())
    }
}

/// Handle to a running conversion.
#[derive(Debug)]
pub struct ConversionJob {
    pub id: ConversionId,
    handle: JoinHandle<ConversionStatus>,
}

impl ConversionJob {
    /// Wait for the terminal status. The record itself is in the store.
    pub async fn wait(self) -> ConversionStatus {
        self.handle.await.unwrap_or(ConversionStatus::Error)
    }
}

/// Record a `processing` conversion and run it in the background.
///
/// # Errors
/// Only when the initial record cannot be stored. Conversion failures are
/// written to the record, never returned.
pub async fn spawn_conversion(
    store: Arc<dyn RecordStore>,
    request: ConversionRequest,
) -> Result<ConversionJob, ConvertError> {
    let id = ConversionId::new();
    let record = ConversionRecord::processing(id, &request.filename, &request.type_tag);
    store
        .put(record.clone())
        .await
        .map_err(|e| ConvertError::Internal(format!("record store: {e}")))?;
    info!("Conversion {} queued for '{}'", id, request.filename);

    let handle = tokio::spawn(async move {
        let finished = match run(request).await {
            Ok((result, tokens)) => record.complete(result, tokens),
            Err(message) => {
                warn!("Conversion {} failed: {}", id, message);
                record.fail(message)
            }
        };
        let status = finished.status;
        if let Err(e) = store.put(finished).await {
            error!("Conversion {}: could not store terminal record: {}", id, e);
        }
        status
    });

    Ok(ConversionJob { id, handle })
}

/// Run one conversion on its own task so a panic in a parser is caught here.
async fn run(request: ConversionRequest) -> Result<(ProcessedContent, u64), String> {
    let task = tokio::spawn(async move {
        process_with_estimate(
            &request.path,
            &request.filename,
            &request.type_tag,
            &request.options,
            &request.estimator,
        )
        .await
    });

    match task.await {
        Ok(Ok(output)) => Ok((output.processed, output.estimate.tokens)),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("Conversion task aborted: {e}")),
    }
}
