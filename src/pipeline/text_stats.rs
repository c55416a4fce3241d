//! Shared text heuristics: counting, sampling and heading detection.
//!
//! These are intentionally approximate. The thresholds are fixed constants
//! so two runs over the same text always agree.

use once_cell::sync::Lazy;
use regex::Regex;

/// Words per minute assumed for reading-time estimates.
pub const READING_WORDS_PER_MINUTE: usize = 200;

/// Words per printed page assumed for page estimates.
pub const WORDS_PER_PAGE: usize = 250;

/// Leading paragraphs kept in `summary` mode.
pub const SUMMARY_HEAD_PARAGRAPHS: usize = 3;

/// Trailing paragraphs kept in `summary` mode.
pub const SUMMARY_TAIL_PARAGRAPHS: usize = 2;

/// Maximum number of potential headings reported.
pub const MAX_POTENTIAL_HEADINGS: usize = 10;

// A potential heading is shorter than HEADING_MAX_CHARS, has at most
// HEADING_MAX_WORDS words, is longer than HEADING_MIN_CHARS and does not
// end with a period.
const HEADING_MAX_CHARS: usize = 100;
const HEADING_MAX_WORDS: usize = 8;
const HEADING_MIN_CHARS: usize = 3;

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Split on blank-line-delimited runs, trimming each paragraph and dropping
/// empty ones.
pub fn paragraphs(text: &str) -> Vec<String> {
    RE_PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Raw lines, exactly as in the text (CRLF tolerated).
pub fn raw_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Trimmed lines with blank lines removed.
pub fn trimmed_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whitespace-delimited, non-empty tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Unicode scalar values.
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Ceiling division; `ceil_div(0, d) == 0`.
pub fn ceil_div(n: usize, d: usize) -> usize {
    if d == 0 {
        0
    } else {
        n.div_ceil(d)
    }
}

/// `ceil(words / 200)` minutes.
pub fn reading_time_minutes(words: usize) -> usize {
    ceil_div(words, READING_WORDS_PER_MINUTE)
}

/// `ceil(words / 250)` pages.
pub fn estimated_pages(words: usize) -> usize {
    ceil_div(words, WORDS_PER_PAGE)
}

/// First `n` items.
pub fn head<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    items.iter().take(n).cloned().collect()
}

/// Last `n` items. Overlaps [`head`] when the list is short.
pub fn tail<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    items[items.len().saturating_sub(n)..].to_vec()
}

/// Heuristic heading test: under 100 chars, at most 8 words, more than 3
/// chars, not ending with a period.
pub fn is_potential_heading(line: &str) -> bool {
    let line = line.trim();
    let len = line.chars().count();
    len < HEADING_MAX_CHARS
        && len > HEADING_MIN_CHARS
        && word_count(line) <= HEADING_MAX_WORDS
        && !line.ends_with('.')
}

/// Up to 10 lines that look like headings, in document order.
pub fn potential_headings(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| is_potential_heading(l))
        .take(MAX_POTENTIAL_HEADINGS)
        .map(str::to_string)
        .collect()
}

/// Human-readable size using base-1024 units with two decimals,
/// e.g. `1.50 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
