//! Heuristic token estimation for converted documents.
//!
//! These numbers are approximations, not the output of a real tokenizer.
//! The estimate averages a character-based guess (`ceil(chars / 4)`) and a
//! word-based guess (`ceil(words * 1.3)`) over a flattened rendering of the
//! envelope.
//!
//! Characters are counted as Unicode scalar values.

use crate::config::EstimatorConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token count plus the figures derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenEstimate {
    pub tokens: u64,
    /// USD at the configured flat rate.
    pub estimated_cost: f64,
    /// Share of the configured context window, in percent (may exceed 100).
    pub context_percentage: f64,
}

impl TokenEstimate {
    pub fn from_tokens(tokens: u64, config: &EstimatorConfig) -> Self {
        Self {
            tokens,
            estimated_cost: estimate_cost(tokens, config),
            context_percentage: context_percentage(tokens, config),
        }
    }

    /// Estimate a structured value and derive cost and context share.
    pub fn for_value(value: &Value, config: &EstimatorConfig) -> Self {
        Self::from_tokens(estimate_tokens(value), config)
    }

    /// True when the estimate would not fit in the configured window.
    pub fn exceeds_context(&self) -> bool {
        self.context_percentage > 100.0
    }
}

/// Flatten an arbitrary JSON value into one whitespace-joined string.
///
/// Object keys count as text and precede their values. Arrays flatten
/// element-wise. Scalars use their display form (`null`, `true`, `42`, `1.5`).
pub fn flatten_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(flatten_text).collect::<Vec<_>>().join(" "),
        Value::Object(map) => map
            .iter()
            .map(|(key, v)| format!("{key} {}", flatten_text(v)))
            .collect::<Vec<_>>()
            .join(" "),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
    }
}

/// Estimate the token count of a structured value.
pub fn estimate_tokens(value: &Value) -> u64 {
    estimate_text_tokens(&flatten_text(value))
}

/// Estimate the token count of plain text.
///
/// `round((ceil(chars / 4) + ceil(words * 1.3)) / 2)`; empty text yields `0`.
pub fn estimate_text_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    let words = text.split_whitespace().count() as u64;

    let char_estimate = chars.div_ceil(4);
    // words * 1.3 computed exactly as words * 13 / 10
    let word_estimate = (words * 13).div_ceil(10);

    // Half-up rounding of the mean
    (char_estimate + word_estimate).div_ceil(2)
}

/// `(tokens / 1000) * cost_per_1k_tokens`.
pub fn estimate_cost(tokens: u64, config: &EstimatorConfig) -> f64 {
    (tokens as f64 / 1000.0) * config.cost_per_1k_tokens
}

/// `(tokens / context_window) * 100`.
pub fn context_percentage(tokens: u64, config: &EstimatorConfig) -> f64 {
    if config.context_window == 0 {
        return 0.0;
    }
    (tokens as f64 / config.context_window as f64) * 100.0
}
