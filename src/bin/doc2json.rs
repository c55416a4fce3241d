//! CLI binary for doc2json.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionOptions` / `EstimatorConfig` and prints the envelope.

use anyhow::{bail, Context, Result};
use clap::Parser;
use doc2json::{
    process_to_file, process_with_estimate, ConversionOptions, ConversionOutput, ConversionType,
    ConvertError, DocumentFormat, EstimatorConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summary of a PDF (stdout)
  doc2json report.pdf

  # Everything that can be extracted, written to a file
  doc2json --mode full-content data.csv -o data.json

  # Structure only, for an upload saved without its extension
  doc2json --type docx --filename "Q3 plan.docx" /tmp/upload-7f3a

  # Price the output for a different model
  doc2json --context-window 200000 --cost-per-1k 0.015 notes.md

SUPPORTED TYPES:
  pdf docx txt md csv json xml jpg jpeg png gif bmp webp

ENVIRONMENT VARIABLES:
  DOC2JSON_MODE            Default conversion mode
  DOC2JSON_CONTEXT_WINDOW  Context window used for the percentage estimate
  DOC2JSON_COST_PER_1K     Cost per 1,000 tokens used for the cost estimate
  RUST_LOG                 Overrides --verbose / --quiet log filtering

EXIT STATUS:
  0  converted
  1  environment or configuration failure
  2  unsupported type, unreadable or malformed input
"#;

/// Convert documents to structured JSON with token estimates.
#[derive(Parser, Debug)]
#[command(
    name = "doc2json",
    version,
    about = "Convert documents to structured JSON with token estimates",
    long_about = "Convert PDF, DOCX, text, Markdown, CSV, JSON, XML and image files into a \
normalised JSON envelope (metadata + content) and estimate how many language-model tokens \
the result will cost.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// File to convert.
    input: PathBuf,

    /// Declared type tag. Defaults to the input's extension.
    #[arg(short = 't', long = "type", env = "DOC2JSON_TYPE")]
    type_tag: Option<String>,

    /// Original file name recorded in the envelope. Defaults to the input's
    /// file name.
    #[arg(long, env = "DOC2JSON_FILENAME")]
    filename: Option<String>,

    /// Conversion mode.
    #[arg(short, long, env = "DOC2JSON_MODE", value_enum, default_value = "summary")]
    mode: ModeArg,

    /// Keep raw line layout and rendered DOCX markup.
    #[arg(long, env = "DOC2JSON_PRESERVE_FORMATTING")]
    preserve_formatting: bool,

    /// Advisory: request table content.
    #[arg(long, env = "DOC2JSON_INCLUDE_TABLES")]
    include_tables: bool,

    /// Advisory: request image content.
    #[arg(long, env = "DOC2JSON_INCLUDE_IMAGES")]
    include_images: bool,

    /// Context window (tokens) for the percentage estimate.
    #[arg(long, env = "DOC2JSON_CONTEXT_WINDOW", default_value_t = doc2json::config::DEFAULT_CONTEXT_WINDOW)]
    context_window: u64,

    /// Cost per 1,000 tokens for the cost estimate.
    #[arg(long = "cost-per-1k", env = "DOC2JSON_COST_PER_1K", default_value_t = doc2json::config::DEFAULT_COST_PER_1K_TOKENS)]
    cost_per_1k: f64,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long, env = "DOC2JSON_OUTPUT")]
    output: Option<PathBuf>,

    /// Print only the envelope, without the estimate.
    #[arg(long)]
    envelope_only: bool,

    /// Single-line JSON instead of pretty-printed.
    #[arg(long, env = "DOC2JSON_COMPACT")]
    compact: bool,

    /// Disable the spinner.
    #[arg(long, env = "DOC2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2JSON_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Summary,
    FullContent,
    MetadataOnly,
}

impl From<ModeArg> for ConversionType {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Summary => ConversionType::Summary,
            ModeArg::FullContent => ConversionType::FullContent,
            ModeArg::MetadataOnly => ConversionType::MetadataOnly,
        }
    }
}

/// Exit status for a conversion the input itself made impossible (unknown
/// type, unreadable or malformed file).
const EXIT_BAD_INPUT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_status(&err))
        }
    }
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ConvertError>() {
        Some(e) if e.is_input_error() => EXIT_BAD_INPUT,
        _ => 1,
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives the feedback that matters; library INFO logs would
    // only interleave with it.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let filename = original_filename(&cli)?;
    let type_tag = match cli.type_tag.clone() {
        Some(tag) => tag,
        None => DocumentFormat::tag_from_filename(&filename).with_context(|| {
            format!(
                "Cannot infer a type from '{filename}'; pass --type (one of {})",
                DocumentFormat::SUPPORTED_TAGS.join(", ")
            )
        })?,
    };

    let options = ConversionOptions::builder()
        .conversion_type(cli.mode.into())
        .include_tables(cli.include_tables)
        .include_images(cli.include_images)
        .preserve_formatting(cli.preserve_formatting)
        .build();
    let estimator = EstimatorConfig::builder()
        .context_window(cli.context_window)
        .cost_per_1k_tokens(cli.cost_per_1k)
        .build()
        .context("Invalid estimator settings")?;

    // ── Run conversion ───────────────────────────────────────────────────
    let spinner = show_progress.then(|| spinner(&filename));
    let start = Instant::now();

    // The library writes the default pretty document itself; other shapes are
    // rendered here.
    let library_writes = !cli.envelope_only && !cli.compact;
    let result = match cli.output {
        Some(ref output_path) if library_writes => {
            process_to_file(&cli.input, &filename, &type_tag, &options, &estimator, output_path)
                .await
        }
        _ => process_with_estimate(&cli.input, &filename, &type_tag, &options, &estimator).await,
    };
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let output = result.with_context(|| format!("Conversion of '{filename}' failed"))?;
    let elapsed_ms = start.elapsed().as_millis();

    match cli.output {
        Some(ref output_path) if !library_writes => {
            let json = render(&output, &cli)?;
            std::fs::write(output_path, json)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
        }
        Some(_) => {}
        None => {
            let json = render(&output, &cli)?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{json}").context("Failed to write to stdout")?;
        }
    }

    // ── Summary line ─────────────────────────────────────────────────────
    if !cli.quiet {
        let est = &output.estimate;
        let marker = if est.exceeds_context() {
            yellow("⚠")
        } else {
            green("✔")
        };
        let target = cli
            .output
            .as_ref()
            .map(|p| format!("  →  {}", bold(&p.display().to_string())))
            .unwrap_or_default();
        eprintln!(
            "{}  {} ({}, {})  {}ms{}",
            marker,
            bold(&filename),
            output.processed.document_type,
            output.processed.conversion_type,
            elapsed_ms,
            target,
        );
        eprintln!(
            "   ~{} tokens  /  ${:.4}  /  {:.2}% of {}-token context",
            dim(&est.tokens.to_string()),
            est.estimated_cost,
            est.context_percentage,
            estimator.context_window,
        );
    }

    Ok(())
}

fn original_filename(cli: &Cli) -> Result<String> {
    if let Some(ref name) = cli.filename {
        return Ok(name.clone());
    }
    match cli.input.file_name().and_then(|n| n.to_str()) {
        Some(name) => Ok(name.to_string()),
        None => bail!("Input path {} has no file name", cli.input.display()),
    }
}

fn render(output: &ConversionOutput, cli: &Cli) -> Result<String> {
    let json = match (cli.envelope_only, cli.compact) {
        (true, true) => serde_json::to_string(&output.processed),
        (true, false) => serde_json::to_string_pretty(&output.processed),
        (false, true) => serde_json::to_string(output),
        (false, false) => serde_json::to_string_pretty(output),
    };
    json.context("Failed to serialise output")
}

fn spinner(filename: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Converting");
    bar.set_message(
        Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename)
            .to_string(),
    );
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}
