//! CLI binary for invoice2csv.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use invoice2csv::{
    extract, extract_to_csv, inspect_folder, to_csv_string, ExtractionConfig,
    ExtractionProgressCallback, ProgressCallback, RunOutcome, DEFAULT_EXPORT_FILE_NAME,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while the folder downloads, then a
/// per-document progress bar. Documents are processed sequentially, so a
/// single start-time slot is enough for elapsed reporting.
struct CliProgressCallback {
    bar: ProgressBar,
    current_start: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_fetch_complete

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            current_start: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Processing");
    }

    fn elapsed_secs(&self) -> f64 {
        self.current_start
            .lock()
            .unwrap()
            .take()
            .map(|t| t.elapsed().as_millis() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_fetch_start(&self, _folder_url: &str) {
        self.bar.set_prefix("Downloading");
        self.bar.set_message("fetching folder…");
    }

    fn on_fetch_complete(&self, pdf_count: usize) {
        self.activate_bar(pdf_count);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{pdf_count} PDF file(s) downloaded"))
        ));
    }

    fn on_document_start(&self, file_name: &str, _index: usize, _total: usize) {
        *self.current_start.lock().unwrap() = Some(Instant::now());
        self.bar.set_message(file_name.to_string());
    }

    fn on_document_complete(&self, file_name: &str, _index: usize, _total: usize, rows: usize) {
        let elapsed = self.elapsed_secs();
        self.bar.println(format!(
            "  {} {:<32}  {:<10}  {}",
            green("✓"),
            file_name,
            dim(&format!("{rows:>3} rows")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, file_name: &str, _index: usize, _total: usize, error: &str) {
        let elapsed = self.elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:<32}  {}  {}",
            red("✗"),
            file_name,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, processed: usize, failed: usize, total_rows: usize) {
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} document(s) processed, {} rows extracted",
                green("✔"),
                bold(&processed.to_string()),
                bold(&total_rows.to_string()),
            );
        } else {
            eprintln!(
                "{} {} processed, {} failed, {} rows extracted",
                cyan("⚠"),
                bold(&processed.to_string()),
                red(&failed.to_string()),
                bold(&total_rows.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every invoice in a shared folder to all_invoices.csv
  invoice2csv https://drive.google.com/drive/folders/FOLDER_ID

  # Write to a specific file
  invoice2csv https://drive.google.com/drive/folders/FOLDER_ID -o q3_invoices.csv

  # Print the CSV to stdout instead of a file
  invoice2csv --stdout https://drive.google.com/drive/folders/FOLDER_ID

  # Use a specific model
  invoice2csv --provider openai --model gpt-4.1 https://drive.google.com/drive/folders/FOLDER_ID

  # List the folder contents without processing (no API key needed)
  invoice2csv --list-only https://drive.google.com/drive/folders/FOLDER_ID

  # Strict mode: abort the whole batch on the first bad document
  invoice2csv --fail-fast https://drive.google.com/drive/folders/FOLDER_ID

  # Structured JSON outcome (documents, stats, warnings)
  invoice2csv --json https://drive.google.com/drive/folders/FOLDER_ID > outcome.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  TESSDATA_PREFIX         Tesseract language-data directory

SETUP:
  1. Install Tesseract:   apt install tesseract-ocr libleptonica-dev
  2. Set API key:         export OPENAI_API_KEY=sk-...
  3. Extract:             invoice2csv <shared folder URL>
"#;

/// Extract structured invoice data from a shared folder of PDFs into CSV.
#[derive(Parser, Debug)]
#[command(
    name = "invoice2csv",
    version,
    about = "Extract structured invoice data from shared PDF folders into CSV",
    long_about = "Download every PDF in a shared folder, OCR each page, structure the text \
through a hosted LLM with a fixed 15-column invoice schema, and consolidate the results \
into one CSV.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Shared-folder URL containing the invoice PDFs.
    folder_url: String,

    /// Output CSV path.
    #[arg(short, long, env = "INVOICE2CSV_OUTPUT", default_value = DEFAULT_EXPORT_FILE_NAME)]
    output: PathBuf,

    /// Print the CSV to stdout instead of writing a file.
    #[arg(long, conflicts_with = "output")]
    stdout: bool,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set."
    )]
    provider: Option<String>,

    /// Rendering DPI (72–600).
    #[arg(long, env = "INVOICE2CSV_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// JPEG quality for rendered pages (1–100).
    #[arg(long, env = "INVOICE2CSV_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Tesseract language code.
    #[arg(long, env = "INVOICE2CSV_LANG", default_value = "eng")]
    lang: String,

    /// Marker for missing or empty cells.
    #[arg(long, env = "INVOICE2CSV_PLACEHOLDER", default_value = "-")]
    placeholder: String,

    /// Abort the whole batch on the first document failure.
    #[arg(long, env = "INVOICE2CSV_FAIL_FAST")]
    fail_fast: bool,

    /// Keep the scratch directory (downloads + invoice.md) after the run.
    #[arg(long, env = "INVOICE2CSV_KEEP_SCRATCH")]
    keep_scratch: bool,

    /// Scratch directory override (default: a fresh temp dir per run).
    #[arg(long, env = "INVOICE2CSV_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Max LLM output tokens per document.
    #[arg(long, env = "INVOICE2CSV_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "INVOICE2CSV_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Retries per document on LLM failure.
    #[arg(long, env = "INVOICE2CSV_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Output structured JSON (RunOutcome) instead of CSV.
    #[arg(long, env = "INVOICE2CSV_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "INVOICE2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// List the shared folder's files without downloading or processing.
    #[arg(long)]
    list_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INVOICE2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "INVOICE2CSV_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "INVOICE2CSV_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-document LLM call timeout in seconds.
    #[arg(long, env = "INVOICE2CSV_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.stdout;
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

    // ── List-only mode (no API key needed) ───────────────────────────────
    if cli.list_only {
        let config = ExtractionConfig::builder()
            .download_timeout_secs(cli.download_timeout)
            .build()
            .context("Invalid configuration")?;

        let files = inspect_folder(&cli.folder_url, &config)
            .await
            .context("Failed to list shared folder")?;

        if cli.json {
            let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
            println!("{}", serde_json::to_string_pretty(&names)?);
        } else if files.is_empty() {
            println!("(folder is empty)");
        } else {
            for file in &files {
                println!("{}", file.name);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run the pipeline ─────────────────────────────────────────────────
    let outcome = if cli.stdout || cli.json {
        extract(&cli.folder_url, &config)
            .await
            .context("Extraction failed")?
    } else {
        extract_to_csv(&cli.folder_url, &cli.output, &config)
            .await
            .context("Extraction failed")?
    };

    report_warnings(&outcome, cli.quiet);

    // ── Emit results ─────────────────────────────────────────────────────
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if outcome.is_no_input() {
        anyhow::bail!("No PDF files found in the shared folder.");
    }

    let Some(ref table) = outcome.table else {
        anyhow::bail!(
            "No invoice tables could be extracted ({} document(s) attempted).",
            outcome.stats.documents_total
        );
    };

    if cli.stdout {
        let csv = to_csv_string(table).context("CSV serialisation failed")?;
        io::stdout()
            .lock()
            .write_all(csv.as_bytes())
            .context("Failed to write to stdout")?;
    } else if !cli.quiet {
        eprintln!(
            "{}  {} rows  →  {}",
            green("✔"),
            bold(&table.row_count().to_string()),
            bold(&cli.output.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&outcome.stats.total_input_tokens.to_string()),
            dim(&outcome.stats.total_output_tokens.to_string()),
            outcome.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .jpeg_quality(cli.jpeg_quality)
        .ocr_language(cli.lang.as_str())
        .placeholder(cli.placeholder.as_str())
        .fail_fast(cli.fail_fast)
        .keep_scratch(cli.keep_scratch)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Print run warnings (cleanup failures, ignored files) to stderr.
fn report_warnings(outcome: &RunOutcome, quiet: bool) {
    if quiet {
        return;
    }
    for warning in &outcome.warnings {
        match &warning.file_name {
            Some(name) => eprintln!("{} {}: {}", yellow("⚠"), name, warning.message),
            None => eprintln!("{} {}", yellow("⚠"), warning.message),
        }
    }
}
