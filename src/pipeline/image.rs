//! Raster image description.
//!
//! Images carry no extractable text, so the envelope only describes the
//! file. Pixel dimensions are read from the header when the `image` crate
//! can guess the format; otherwise they are omitted.

use crate::config::{ConversionOptions, ConversionType};
use crate::error::ConvertError;
use crate::format::ImageFormat;
use crate::pipeline::input::{self, FileStats};
use crate::pipeline::text_stats::format_file_size;
use crate::pipeline::{into_map, Extracted};
use image::ImageReader;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, warn};

const NO_TEXT_NOTE: &str = "Text content cannot be extracted from images";

const NOT_CONVERTIBLE: &str =
    "Images cannot be converted to text. Only file metadata is available.";

const BINARY_NOTE: &str = "Binary image data is not included in the output";

/// Operations that make sense for an image upload.
pub const AVAILABLE_OPERATIONS: [&str; 3] = ["view", "download", "metadata_extraction"];

pub async fn extract(
    path: &Path,
    format: ImageFormat,
    options: &ConversionOptions,
) -> Result<Extracted, ConvertError> {
    let stats = input::file_stats(path, format.tag()).await?;

    let header_path = path.to_path_buf();
    let dimensions = tokio::task::spawn_blocking(move || read_dimensions(&header_path))
        .await
        .map_err(|e| ConvertError::Internal(format!("image header task panicked: {e}")))?;
    let dimensions = match dimensions {
        Ok(d) => {
            debug!("Image header: {}x{}", d.0, d.1);
            Some(d)
        }
        Err(e) => {
            warn!("Could not read image dimensions of {}: {}", path.display(), e);
            None
        }
    };

    Ok(build(format, path, &stats, dimensions, options))
}

/// Width and height from the image header. Only the header is read; the
/// format is sniffed from the leading bytes, not the extension.
pub fn read_dimensions(path: &Path) -> Result<(u32, u32), String> {
    ImageReader::open(path)
        .map_err(|e| e.to_string())?
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| e.to_string())
}

pub fn build(
    format: ImageFormat,
    path: &Path,
    stats: &FileStats,
    dimensions: Option<(u32, u32)>,
    options: &ConversionOptions,
) -> Extracted {
    let format_name = format.tag().to_ascii_uppercase();
    let size = format_file_size(stats.size);

    let mut metadata = into_map(json!({
        "file_size": stats.size,
        "creation_date": stats.created_iso(),
        "mime_type": format.mime_type(),
        "format": format_name,
    }));
    if let Some((width, height)) = dimensions {
        metadata.insert("width".into(), Value::from(width));
        metadata.insert("height".into(), Value::from(height));
    }

    let content = match options.conversion_type {
        ConversionType::Summary => json!({
            "description": format!("{format_name} image file ({size})"),
            "image_info": {
                "format": format_name,
                "size": size,
                "note": NO_TEXT_NOTE,
            },
        }),
        ConversionType::FullContent => json!({
            "message": NOT_CONVERTIBLE,
            "image_info": {
                "format": format_name,
                "size": size,
                "path": path.display().to_string(),
                "mime_type": format.mime_type(),
            },
            "available_operations": AVAILABLE_OPERATIONS,
        }),
        ConversionType::MetadataOnly => json!({
            "structure": {
                "type": "IMAGE",
                "format": format_name,
                "is_binary": true,
                "note": BINARY_NOTE,
            }
        }),
    };

    Extracted {
        metadata,
        content: into_map(content),
    }
}
