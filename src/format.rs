//! Closed set of supported document formats.
//!
//! Dispatch is a pure lookup on the lower-cased type tag the caller derived
//! from the upload's file extension. There is no content sniffing: a `.txt`
//! file full of PDF bytes is processed as text.

use crate::error::ConvertError;
use std::fmt;
use std::str::FromStr;

/// Raster image formats accepted by the image extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpg,
    Jpeg,
    Png,
    Gif,
    Bmp,
    Webp,
}

impl ImageFormat {
    pub fn tag(&self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpg | ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// Every format the dispatcher knows how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
    Markdown,
    Csv,
    Json,
    Xml,
    Image(ImageFormat),
}

impl DocumentFormat {
    /// Every accepted type tag, in dispatch-table order.
    pub const SUPPORTED_TAGS: &'static [&'static str] = &[
        "pdf", "docx", "txt", "md", "csv", "json", "xml", "jpg", "jpeg", "png", "gif", "bmp",
        "webp",
    ];

    /// Lower-case tag written to `document_type`.
    pub fn tag(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Text => "txt",
            DocumentFormat::Markdown => "md",
            DocumentFormat::Csv => "csv",
            DocumentFormat::Json => "json",
            DocumentFormat::Xml => "xml",
            DocumentFormat::Image(img) => img.tag(),
        }
    }

    /// Upper-case name used in log lines and error messages.
    pub fn display_name(&self) -> String {
        self.tag().to_ascii_uppercase()
    }

    /// Derive the type tag from a file name's extension, the way upload
    /// handlers do before calling [`crate::convert::process`].
    pub fn tag_from_filename(filename: &str) -> Option<String> {
        let (stem, ext) = filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DocumentFormat {
    type Err = ConvertError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let format = match tag.to_ascii_lowercase().as_str() {
            "pdf" => DocumentFormat::Pdf,
            "docx" => DocumentFormat::Docx,
            "txt" => DocumentFormat::Text,
            "md" => DocumentFormat::Markdown,
            "csv" => DocumentFormat::Csv,
            "json" => DocumentFormat::Json,
            "xml" => DocumentFormat::Xml,
            "jpg" => DocumentFormat::Image(ImageFormat::Jpg),
            "jpeg" => DocumentFormat::Image(ImageFormat::Jpeg),
            "png" => DocumentFormat::Image(ImageFormat::Png),
            "gif" => DocumentFormat::Image(ImageFormat::Gif),
            "bmp" => DocumentFormat::Image(ImageFormat::Bmp),
            "webp" => DocumentFormat::Image(ImageFormat::Webp),
            _ => {
                return Err(ConvertError::UnsupportedFormat {
                    tag: tag.to_string(),
                })
            }
        };
        Ok(format)
    }
}
