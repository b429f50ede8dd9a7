//! Error types for the invoice2csv library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the run cannot proceed at all (bad folder
//!   URL, unreachable file host, no LLM provider configured). Returned as
//!   `Err(ExtractError)` from the top-level `extract*` functions.
//!
//! * [`DocumentError`] — **Non-fatal**: a single document failed (corrupt
//!   PDF, OCR glitch, LLM call exhausted its retries) but the other
//!   documents are fine. Stored inside [`crate::output::DocumentOutcome`]
//!   so callers can inspect partial success rather than losing the whole
//!   batch to one bad file.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first document failure (`fail_fast`), log and continue, or collect all
//! errors for a post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the invoice2csv library.
///
/// Document-level failures use [`DocumentError`] and are stored in
/// [`crate::output::DocumentOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The folder reference is not a recognisable shared-folder URL.
    #[error("Invalid shared-folder URL '{url}': {reason}")]
    InvalidFolderUrl { url: String, reason: String },

    /// The folder listing or a contained file could not be downloaded.
    #[error("Failed to download '{url}': {reason}\nCheck the folder link and your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The scratch directory could not be created or written.
    #[error("Failed to prepare scratch directory '{path}': {source}")]
    ScratchDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No LLM provider is configured (missing API key etc.). Checked before
    /// any file is downloaded.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every document failed; there is nothing to consolidate.
    #[error("All {total} documents failed.\nFirst error: {first_error}")]
    AllDocumentsFailed { total: usize, first_error: String },

    /// A document failed while `fail_fast` was set.
    #[error("Processing aborted on '{file_name}': {source}")]
    DocumentFailed {
        file_name: String,
        #[source]
        source: DocumentError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output CSV file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialisation failed.
    #[error("CSV serialisation failed: {0}")]
    Csv(#[from] csv::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Stored on [`crate::output::DocumentOutcome`] when a document fails. The
/// overall run continues unless `fail_fast` is set or ALL documents fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The PDF could not be opened or a page could not be rasterised.
    #[error("'{file_name}': rasterisation failed: {detail}")]
    RenderFailed { file_name: String, detail: String },

    /// Tesseract failed on one of the page images.
    #[error("'{file_name}': OCR failed on page {page}: {detail}")]
    OcrFailed {
        file_name: String,
        page: usize,
        detail: String,
    },

    /// OCR support was not compiled in (`ocr` feature disabled).
    #[error("OCR support not available; rebuild with --features ocr and install Tesseract/Leptonica")]
    OcrUnavailable,

    /// LLM call failed after retries.
    #[error("'{file_name}': LLM call failed after {retries} retries: {detail}")]
    LlmFailed {
        file_name: String,
        retries: u32,
        detail: String,
    },

    /// The model response contained no markdown table.
    #[error("'{file_name}': no table found in model response")]
    NoTableFound { file_name: String },
}

impl DocumentError {
    /// True for the soft "no table" condition: the document contributes
    /// nothing, but it is a skip, not a failure.
    pub fn is_soft_skip(&self) -> bool {
        matches!(self, DocumentError::NoTableFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_documents_failed_display() {
        let e = ExtractError::AllDocumentsFailed {
            total: 4,
            first_error: "corrupt xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 4 documents failed"), "got: {msg}");
        assert!(msg.contains("corrupt xref"));
    }

    #[test]
    fn invalid_folder_url_display() {
        let e = ExtractError::InvalidFolderUrl {
            url: "ftp://nope".into(),
            reason: "no folder id".into(),
        };
        assert!(e.to_string().contains("ftp://nope"));
    }

    #[test]
    fn llm_failed_display() {
        let e = DocumentError::LlmFailed {
            file_name: "inv_01.pdf".into(),
            retries: 2,
            detail: "HTTP 503".into(),
        };
        assert!(e.to_string().contains("inv_01.pdf"));
        assert!(e.to_string().contains("2 retries"));
    }

    #[test]
    fn no_table_is_soft_skip() {
        let e = DocumentError::NoTableFound {
            file_name: "inv_01.pdf".into(),
        };
        assert!(e.is_soft_skip());

        let e = DocumentError::OcrUnavailable;
        assert!(!e.is_soft_skip());
    }
}
