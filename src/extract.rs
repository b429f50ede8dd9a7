//! Top-level batch extraction entry points.
//!
//! One call to [`extract`] performs a whole run: resolve the LLM provider,
//! mirror the shared folder into scratch, walk every PDF through
//! render → OCR → LLM → parse, consolidate the parsed tables, clean up the
//! scratch directory, and return the outcome. Documents are processed
//! strictly one at a time.
//!
//! Per-document failures are accumulated on the outcome rather than
//! aborting the batch (unless `fail_fast` is set), so the rows already
//! extracted survive a later document's error.

use crate::config::ExtractionConfig;
use crate::consolidate::{ConsolidatedTable, Table};
use crate::error::{DocumentError, ExtractError};
use crate::export;
use crate::output::{DocumentOutcome, RunOutcome, RunStats, RunWarning, WarningCode};
use crate::pipeline::{fetch, llm, ocr, parse, render};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Model used when the caller names a provider but no model.
const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Run the full pipeline against a shared folder of PDF invoices.
///
/// # Arguments
/// * `folder_url` — shared-folder URL containing the PDFs
/// * `config`     — extraction configuration
///
/// # Returns
/// `Ok(RunOutcome)` on success, even if some documents failed (check
/// `outcome.documents`). `outcome.table` is `None` when the folder held no
/// PDFs or no document yielded a table.
///
/// # Errors
/// Returns `Err(ExtractError)` only for fatal errors: no provider
/// configured, invalid folder URL, fetch failure, or every document
/// failing outright.
pub async fn extract(
    folder_url: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<RunOutcome, ExtractError> {
    let total_start = Instant::now();
    let folder_url = folder_url.as_ref();
    info!("Starting extraction run: {}", folder_url);

    // ── Step 1: Credential check (blocks the run before any download) ───
    let provider = resolve_provider(config)?;

    // ── Step 2: Prepare scratch directory ────────────────────────────────
    let scratch = Scratch::prepare(config)?;
    let scratch_path = scratch.path().to_path_buf();

    // ── Step 3: Fetch the shared folder ──────────────────────────────────
    // A fetch failure propagates directly: nothing was processed, nothing
    // to clean beyond the scratch dir itself.
    if let Some(ref cb) = config.progress_callback {
        cb.on_fetch_start(folder_url);
    }
    let fetch_start = Instant::now();
    let downloaded =
        fetch::fetch_folder(folder_url, &scratch_path, config.download_timeout_secs).await?;
    let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;

    let mut warnings = Vec::new();
    let pdfs = fetch::filter_pdfs(&downloaded);
    for path in &downloaded {
        if !pdfs.contains(path) {
            let name = render::display_name(path);
            warnings.push(
                RunWarning::new(WarningCode::NonPdfIgnored, "not a .pdf file, ignored")
                    .with_file(name),
            );
        }
    }
    info!(
        "Downloaded {} files, {} PDFs, in {}ms",
        downloaded.len(),
        pdfs.len(),
        fetch_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_fetch_complete(pdfs.len());
    }

    // ── Step 4: No input is a distinct halt, not an error ────────────────
    if pdfs.is_empty() {
        warnings.extend(scratch.cleanup(config.keep_scratch));
        return Ok(RunOutcome {
            table: None,
            documents: Vec::new(),
            stats: RunStats {
                documents_total: 0,
                fetch_duration_ms,
                total_duration_ms: total_start.elapsed().as_millis() as u64,
                ..RunStats::default()
            },
            warnings,
        });
    }

    // ── Step 5: Process documents sequentially ───────────────────────────
    let total = pdfs.len();
    let mut combined = ConsolidatedTable::empty();
    let mut documents: Vec<DocumentOutcome> = Vec::with_capacity(total);

    for (index, pdf_path) in pdfs.iter().enumerate() {
        let file_name = render::display_name(pdf_path);
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(&file_name, index, total);
        }

        let (mut outcome, tables) =
            process_document(&provider, pdf_path, &scratch_path, config).await;

        let rows_before = combined.row_count();
        for table in &tables {
            combined.absorb(table, &config.placeholder);
        }
        outcome.rows = combined.row_count() - rows_before;

        if let Some(ref cb) = config.progress_callback {
            match &outcome.error {
                None => cb.on_document_complete(&file_name, index, total, outcome.rows),
                Some(e) => cb.on_document_error(&file_name, index, total, &e.to_string()),
            }
        }

        let hard_failure = outcome
            .error
            .as_ref()
            .filter(|e| !e.is_soft_skip())
            .cloned();
        documents.push(outcome);

        if config.fail_fast {
            if let Some(error) = hard_failure {
                warnings.extend(scratch.cleanup(config.keep_scratch));
                return Err(ExtractError::DocumentFailed {
                    file_name,
                    source: error,
                });
            }
        }
    }

    // ── Step 6: Cleanup always follows processing ────────────────────────
    warnings.extend(scratch.cleanup(config.keep_scratch));

    // ── Step 7: Compute stats and final shape ────────────────────────────
    let processed = documents.iter().filter(|d| d.succeeded()).count();
    let skipped = documents.iter().filter(|d| d.skipped()).count();
    let failed = documents.len() - processed - skipped;

    if processed == 0 && skipped == 0 {
        let first_error = documents
            .iter()
            .find_map(|d| d.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(ExtractError::AllDocumentsFailed {
            total,
            first_error,
        });
    }

    let stats = RunStats {
        documents_total: total,
        documents_processed: processed,
        documents_failed: failed,
        documents_skipped: skipped,
        total_rows: combined.row_count(),
        total_input_tokens: documents.iter().map(|d| d.input_tokens as u64).sum(),
        total_output_tokens: documents.iter().map(|d| d.output_tokens as u64).sum(),
        fetch_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Run complete: {}/{} documents, {} rows, {}ms total",
        processed, total, stats.total_rows, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(processed, failed, stats.total_rows);
    }

    Ok(RunOutcome {
        table: if combined.is_empty() {
            None
        } else {
            Some(combined)
        },
        documents,
        stats,
        warnings,
    })
}

/// Run the pipeline and write the consolidated table to a CSV file.
///
/// No file is written when the run produced no consolidated result.
pub async fn extract_to_csv(
    folder_url: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<RunOutcome, ExtractError> {
    let outcome = extract(folder_url, config).await?;
    if let Some(ref table) = outcome.table {
        export::write_csv(table, output_path.as_ref())?;
    }
    Ok(outcome)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    folder_url: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<RunOutcome, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(extract(folder_url, config))
}

/// List the shared folder's contents without downloading or processing.
///
/// Does not require an LLM provider or API key.
pub async fn inspect_folder(
    folder_url: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<Vec<fetch::RemoteFile>, ExtractError> {
    fetch::list_folder(folder_url.as_ref(), config.download_timeout_secs).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// The scratch directory for one run: a managed temp dir, or a caller-fixed
/// path.
enum Scratch {
    Temp(TempDir),
    Fixed(PathBuf),
}

impl Scratch {
    fn prepare(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        match &config.scratch_dir {
            Some(path) => {
                std::fs::create_dir_all(path).map_err(|source| ExtractError::ScratchDir {
                    path: path.clone(),
                    source,
                })?;
                Ok(Scratch::Fixed(path.clone()))
            }
            None if config.keep_scratch => {
                // A kept scratch dir must outlive the TempDir guard, so use
                // a plain per-process path instead.
                let path = std::env::temp_dir().join(format!("invoice2csv-{}", std::process::id()));
                std::fs::create_dir_all(&path).map_err(|source| ExtractError::ScratchDir {
                    path: path.clone(),
                    source,
                })?;
                Ok(Scratch::Fixed(path))
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("invoice2csv-")
                    .tempdir()
                    .map_err(|source| ExtractError::ScratchDir {
                        path: std::env::temp_dir(),
                        source,
                    })?;
                Ok(Scratch::Temp(temp))
            }
        }
    }

    fn path(&self) -> &Path {
        match self {
            Scratch::Temp(t) => t.path(),
            Scratch::Fixed(p) => p,
        }
    }

    /// Delete the scratch contents, reporting (not failing on) stubborn
    /// files. With `keep` set, nothing is removed.
    fn cleanup(self, keep: bool) -> Vec<RunWarning> {
        if keep {
            info!("Keeping scratch directory: {}", self.path().display());
            // Leak the TempDir guard so drop doesn't delete the kept files.
            if let Scratch::Temp(t) = self {
                let _ = t.into_path();
            }
            return Vec::new();
        }

        let mut warnings = Vec::new();
        remove_files_recursively(self.path(), &mut warnings);
        if let Err(e) = std::fs::remove_dir_all(self.path()) {
            // Directory-level failure after the per-file pass; report once.
            debug!("Scratch directory removal incomplete: {e}");
        }
        warnings
    }
}

fn remove_files_recursively(dir: &Path, warnings: &mut Vec<RunWarning>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            remove_files_recursively(&path, warnings);
        } else if let Err(e) = std::fs::remove_file(&path) {
            let name = render::display_name(&path);
            warn!("File '{}' could not be deleted: {}", name, e);
            warnings.push(
                RunWarning::new(WarningCode::CleanupFailed, format!("could not delete: {e}"))
                    .with_file(name),
            );
        }
    }
}

/// Walk one document through render → OCR → LLM → parse.
///
/// Never propagates an error upward: failures land on the returned
/// [`DocumentOutcome`] so the caller decides whether the batch continues.
/// The caller fills in `rows` after consolidation.
async fn process_document(
    provider: &Arc<dyn LLMProvider>,
    pdf_path: &Path,
    scratch_path: &Path,
    config: &ExtractionConfig,
) -> (DocumentOutcome, Vec<Table>) {
    let start = Instant::now();
    let file_name = render::display_name(pdf_path);

    let mut outcome = DocumentOutcome {
        file_name: file_name.clone(),
        pages: 0,
        rows: 0,
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: 0,
        retries: 0,
        error: None,
    };

    let fail = |outcome: &mut DocumentOutcome, error: DocumentError| {
        outcome.duration_ms = start.elapsed().as_millis() as u64;
        outcome.error = Some(error);
    };

    // Rasterise
    let pages = match render::render_document(pdf_path, config).await {
        Ok(pages) => pages,
        Err(e) => {
            fail(&mut outcome, e);
            return (outcome, Vec::new());
        }
    };
    outcome.pages = pages.len();

    // OCR
    let extracted_text = match ocr::extract_text(&file_name, pages, config).await {
        Ok(text) => text,
        Err(e) => {
            fail(&mut outcome, e);
            return (outcome, Vec::new());
        }
    };
    debug!("'{}': {} chars of OCR text", file_name, extracted_text.len());

    // Structuring agent
    let response = match llm::structure_text(provider, &file_name, &extracted_text, config).await {
        Ok(response) => response,
        Err(e) => {
            fail(&mut outcome, e);
            return (outcome, Vec::new());
        }
    };
    outcome.input_tokens = response.input_tokens;
    outcome.output_tokens = response.output_tokens;
    outcome.retries = response.retries;

    // Transient per-document artifact, overwritten each iteration. Useful
    // with keep_scratch; losing it never fails the document.
    let md_path = scratch_path.join("invoice.md");
    if let Err(e) = std::fs::write(&md_path, &response.markdown) {
        debug!("Could not write {}: {}", md_path.display(), e);
    }

    // Parse
    let tables = parse::parse_tables(&response.markdown);
    outcome.duration_ms = start.elapsed().as_millis() as u64;

    if tables.is_empty() {
        outcome.error = Some(DocumentError::NoTableFound { file_name });
        return (outcome, Vec::new());
    }

    (outcome, tables)
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// The four-level fallback chain lets library users and CLI users each set
/// exactly as much or as little as they need:
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed
///    and configured the provider entirely; we use it as-is.
///
/// 2. **Named provider + model** (`config.provider_name`) — we call
///    [`ProviderFactory::create_llm_provider`] which reads the
///    corresponding API key (`OPENAI_API_KEY`, etc.) from the environment.
///
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`) —
///    checked before full auto-detection so an explicit model choice is
///    honoured even when multiple API keys are present.
///
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — the factory
///    scans all known API key variables and picks the first available
///    provider.
///
/// This runs before anything is downloaded: a missing credential blocks
/// the run up front.
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    // 3) Environment pair
    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    // Prefer OpenAI explicitly when an OpenAI API key is present, so users
    // with multiple provider keys get a deterministic default.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    // 4) Full auto-detection
    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Instantiate a named provider with the given model.
fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
