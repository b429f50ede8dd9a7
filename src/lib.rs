//! # invoice2csv
//!
//! Batch-extract structured invoice data from a shared folder of PDFs into
//! a single CSV, using OCR and a hosted language model.
//!
//! ## Why this crate?
//!
//! Invoice PDFs are usually scans: there is no embedded text to pull out,
//! and layout-aware extractors choke on the endless variety of invoice
//! templates. Instead this crate rasterises each page, lets Tesseract read
//! the pixels, and hands the raw text to an LLM with a fixed instruction
//! template that demands one well-formed markdown table with a known
//! 15-column schema. Parsing that table is trivial; consolidating many of
//! them into one spreadsheet is bookkeeping.
//!
//! ## Pipeline Overview
//!
//! ```text
//! shared folder URL
//!  │
//!  ├─ 1. Fetch        mirror the folder into a scratch dir, keep the PDFs
//!  ├─ 2. Render       rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. OCR          Tesseract per page, newline-joined in page order
//!  ├─ 4. Structure    LLM call with the 15-column instruction template
//!  ├─ 5. Parse        markdown table → header + rows
//!  ├─ 6. Consolidate  union rows by column name, placeholder-fill gaps
//!  ├─ 7. Cleanup      delete scratch, warn on stubborn files
//!  └─ 8. Export       CSV with one header row, no index column
//! ```
//!
//! Documents are processed strictly one at a time; a failing document is
//! reported and skipped rather than aborting the batch (set
//! `fail_fast` for all-or-nothing runs).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice2csv::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let outcome = extract("https://drive.google.com/drive/folders/FOLDER_ID", &config).await?;
//!     match outcome.table {
//!         Some(table) => println!("{} invoice rows extracted", table.row_count()),
//!         None => println!("no invoices found"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `invoice2csv` binary (clap + anyhow + tracing-subscriber) |
//! | `ocr`   | on      | Links Tesseract/Leptonica via `leptess`; disable on machines without the system libraries |
//!
//! Disable both when using only the parsing/consolidation layers:
//! ```toml
//! invoice2csv = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod consolidate;
pub mod error;
pub mod export;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use consolidate::{consolidate, ConsolidatedTable, Table};
pub use error::{DocumentError, ExtractError};
pub use export::{to_csv_string, write_csv, DEFAULT_EXPORT_FILE_NAME};
pub use extract::{extract, extract_sync, extract_to_csv, inspect_folder};
pub use output::{DocumentOutcome, RunOutcome, RunStats, RunWarning, WarningCode};
pub use pipeline::fetch::RemoteFile;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{RunState, Session};
