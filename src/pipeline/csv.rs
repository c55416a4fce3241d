//! CSV extraction over an async record stream.
//!
//! The file is never buffered whole: records are pulled one at a time from a
//! `csv_async` reader over a Tokio file. Every record is counted, but only
//! `full_content` keeps all rows; the other modes keep the first
//! [`INFERENCE_ROWS`], which covers both the summary sample and type
//! inference.

use crate::config::{ConversionOptions, ConversionType};
use crate::error::ConvertError;
use crate::pipeline::input::{self, FileStats};
use crate::pipeline::Extracted;
use csv_async::{AsyncReaderBuilder, ByteRecord};
use futures::StreamExt;
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::debug;

const FORMAT: &str = "csv";

/// Rows shown in `summary` mode.
pub const SAMPLE_ROWS: usize = 5;

/// Rows inspected when inferring column types.
pub const INFERENCE_ROWS: usize = 10;

/// One data row, keyed by header in header order.
pub type Row = Map<String, Value>;

/// Rows read from a CSV source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    /// All rows, or the leading rows when not everything was retained.
    pub rows: Vec<Row>,
    /// Number of data rows in the file, retained or not.
    pub row_count: usize,
}

pub async fn extract(path: &Path, options: &ConversionOptions) -> Result<Extracted, ConvertError> {
    let stats = input::file_stats(path, FORMAT).await?;
    let file = input::open(path, FORMAT).await?;

    let keep = match options.conversion_type {
        ConversionType::FullContent => usize::MAX,
        _ => INFERENCE_ROWS,
    };
    let table = read_table(file, keep).await?;
    debug!(
        "CSV read: {} rows, {} columns",
        table.row_count,
        table.headers.len()
    );

    Ok(build(&table, &stats, options))
}

/// Stream records from `source`, retaining at most `keep` rows.
///
/// Fields are decoded as UTF-8 with invalid sequences replaced, so a Latin-1
/// export still converts.
pub async fn read_table<R>(source: R, keep: usize) -> Result<CsvTable, ConvertError>
where
    R: tokio::io::AsyncRead + Unpin + Send,
{
    let mut reader = AsyncReaderBuilder::new()
        .flexible(true)
        .create_reader(source);

    let file_headers: Vec<String> = reader
        .byte_headers()
        .await
        .map_err(|e| ConvertError::extraction(FORMAT, e))?
        .iter()
        .map(decode_field)
        .collect();

    let mut rows = Vec::new();
    let mut row_count = 0usize;
    let mut records = reader.byte_records();
    while let Some(record) = records.next().await {
        let record = record.map_err(|e| ConvertError::extraction(FORMAT, e))?;
        row_count += 1;
        if rows.len() < keep {
            rows.push(to_row(&file_headers, &record));
        }
    }

    // Headers are the keys of the first data row: a header-only file has
    // none, and a repeated name is one key.
    let headers = if row_count == 0 {
        Vec::new()
    } else {
        unique_in_order(file_headers)
    };

    Ok(CsvTable {
        headers,
        rows,
        row_count,
    })
}

fn decode_field(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

fn unique_in_order(names: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}

/// Pair cells with headers. Missing cells become `""`, extra cells are
/// dropped. A repeated header keeps its first position and its last cell.
fn to_row(headers: &[String], record: &ByteRecord) -> Row {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let cell = record.get(i).map(decode_field).unwrap_or_default();
            (h.clone(), Value::from(cell))
        })
        .collect()
}

/// Infer a column type from its first non-empty values.
///
/// `integer` / `float` when every value parses as a finite number (float
/// if any contains a decimal point), `boolean` when every value is
/// `true`/`false` in any case, `string` otherwise and `unknown` when the
/// column has no non-empty value.
pub fn infer_type<'a>(values: impl IntoIterator<Item = &'a str>) -> &'static str {
    let values: Vec<&str> = values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        return "unknown";
    }

    let numeric = values
        .iter()
        .all(|v| v.parse::<f64>().map(f64::is_finite).unwrap_or(false));
    if numeric {
        return if values.iter().any(|v| v.contains('.')) {
            "float"
        } else {
            "integer"
        };
    }

    let boolean = values
        .iter()
        .all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false"));
    if boolean {
        "boolean"
    } else {
        "string"
    }
}

fn data_types(table: &CsvTable) -> Map<String, Value> {
    table
        .headers
        .iter()
        .map(|h| {
            let column = table
                .rows
                .iter()
                .take(INFERENCE_ROWS)
                .filter_map(|row| row.get(h).and_then(Value::as_str));
            (h.clone(), Value::from(infer_type(column)))
        })
        .collect()
}

pub fn build(table: &CsvTable, stats: &FileStats, options: &ConversionOptions) -> Extracted {
    let metadata = json!({
        "file_size": stats.size,
        "row_count": table.row_count,
        "column_count": table.headers.len(),
        "headers": table.headers,
    });

    let content = match options.conversion_type {
        ConversionType::Summary => json!({
            "description": format!(
                "CSV file with {} rows and {} columns",
                table.row_count,
                table.headers.len()
            ),
            "headers": table.headers,
            "sample_rows": &table.rows[..table.rows.len().min(SAMPLE_ROWS)],
        }),
        ConversionType::FullContent => json!({
            "headers": table.headers,
            "rows": table.rows,
        }),
        ConversionType::MetadataOnly => json!({
            "structure": {
                "headers": table.headers,
                "data_types": data_types(table),
            }
        }),
    };

    Extracted::new(metadata, content)
}
