//! Configuration types for document conversion and size estimation.
//!
//! Two structs carry every knob:
//!
//! * [`ConversionOptions`]: the per-call request, i.e. which
//!   [`ConversionType`] to produce plus the three advisory boolean flags.
//! * [`EstimatorConfig`]: the pricing and context-window assumptions used
//!   to turn a token count into a cost and a context-window fraction.
//!
//! Both are built via builders so callers set only what they care about and
//! rely on the documented defaults for the rest.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Depth of the content emitted for a document.
///
/// The mode controls only the `content` map of the envelope. The `metadata`
/// map is computed identically for every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionType {
    /// A short description plus head/tail samples and statistics. (default)
    #[default]
    Summary,
    /// Everything the extractor could read.
    FullContent,
    /// Only a structural description of the document.
    MetadataOnly,
}

impl ConversionType {
    /// Wire name of the mode, as it appears in the envelope.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionType::Summary => "summary",
            ConversionType::FullContent => "full_content",
            ConversionType::MetadataOnly => "metadata_only",
        }
    }
}

impl fmt::Display for ConversionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionType {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(ConversionType::Summary),
            "full_content" | "full-content" | "full" => Ok(ConversionType::FullContent),
            "metadata_only" | "metadata-only" | "metadata" => Ok(ConversionType::MetadataOnly),
            other => Err(ConvertError::InvalidConfig(format!(
                "unknown conversion type '{other}' (expected summary, full_content or metadata_only)"
            ))),
        }
    }
}

/// Options for a single conversion call.
///
/// Built via [`ConversionOptions::builder()`] or [`ConversionOptions::default()`].
///
/// # Example
/// ```rust
/// use doc2json::{ConversionOptions, ConversionType};
///
/// let options = ConversionOptions::builder()
///     .conversion_type(ConversionType::FullContent)
///     .preserve_formatting(true)
///     .build();
/// assert!(options.preserve_formatting);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Which content mode to emit. Default: [`ConversionType::Summary`].
    pub conversion_type: ConversionType,

    /// Advisory. Accepted for every format; no extractor changes its output
    /// based on it.
    pub include_tables: bool,

    /// Advisory. Accepted for every format; no extractor changes its output
    /// based on it.
    pub include_images: bool,

    /// Keep raw line layout and rendered markup where the format has any.
    ///
    /// * PDF `full_content`: raw lines instead of trimmed, non-empty lines.
    /// * DOCX: enables `has_formatting` and adds the HTML rendering to
    ///   `full_content`.
    ///
    /// Other formats ignore it.
    pub preserve_formatting: bool,
}

impl ConversionOptions {
    /// Create a new builder for `ConversionOptions`.
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder {
            options: Self::default(),
        }
    }
}

/// Builder for [`ConversionOptions`].
#[derive(Debug)]
pub struct ConversionOptionsBuilder {
    options: ConversionOptions,
}

impl ConversionOptionsBuilder {
    pub fn conversion_type(mut self, t: ConversionType) -> Self {
        self.options.conversion_type = t;
        self
    }

    pub fn include_tables(mut self, v: bool) -> Self {
        self.options.include_tables = v;
        self
    }

    pub fn include_images(mut self, v: bool) -> Self {
        self.options.include_images = v;
        self
    }

    pub fn preserve_formatting(mut self, v: bool) -> Self {
        self.options.preserve_formatting = v;
        self
    }

    /// Every combination of flags is valid, so this cannot fail.
    pub fn build(self) -> ConversionOptions {
        self.options
    }
}

/// Default context window used for the context-percentage figure.
pub const DEFAULT_CONTEXT_WINDOW: u64 = 128_000;

/// Default flat price in USD per 1 000 tokens.
pub const DEFAULT_COST_PER_1K_TOKENS: f64 = 0.03;

/// Pricing and context-window assumptions for [`crate::estimate`].
///
/// ```rust
/// use doc2json::EstimatorConfig;
///
/// let config = EstimatorConfig::builder()
///     .context_window(8_192)
///     .cost_per_1k_tokens(0.01)
///     .build()
///     .unwrap();
/// assert_eq!(config.context_window, 8_192);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Token capacity of the downstream consumer. Default: 128 000.
    pub context_window: u64,

    /// Flat USD price per 1 000 tokens. Default: 0.03.
    pub cost_per_1k_tokens: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            cost_per_1k_tokens: DEFAULT_COST_PER_1K_TOKENS,
        }
    }
}

impl EstimatorConfig {
    /// Create a new builder for `EstimatorConfig`.
    pub fn builder() -> EstimatorConfigBuilder {
        EstimatorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EstimatorConfig`].
#[derive(Debug)]
pub struct EstimatorConfigBuilder {
    config: EstimatorConfig,
}

impl EstimatorConfigBuilder {
    pub fn context_window(mut self, tokens: u64) -> Self {
        self.config.context_window = tokens;
        self
    }

    pub fn cost_per_1k_tokens(mut self, usd: f64) -> Self {
        self.config.cost_per_1k_tokens = usd;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EstimatorConfig, ConvertError> {
        let c = &self.config;
        if c.context_window == 0 {
            return Err(ConvertError::InvalidConfig(
                "context window must be at least 1 token".into(),
            ));
        }
        if !c.cost_per_1k_tokens.is_finite() || c.cost_per_1k_tokens < 0.0 {
            return Err(ConvertError::InvalidConfig(format!(
                "cost per 1k tokens must be a non-negative number, got {}",
                c.cost_per_1k_tokens
            )));
        }
        Ok(self.config)
    }
}
