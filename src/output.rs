//! Result types returned by the extraction pipeline.

use crate::consolidate::ConsolidatedTable;
use crate::error::DocumentError;
use serde::{Deserialize, Serialize};

/// Outcome of one document's trip through render → OCR → LLM → parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutcome {
    /// Source PDF file name inside the scratch directory.
    pub file_name: String,
    /// Pages rasterised from the document.
    pub pages: usize,
    /// Data rows the document contributed to the consolidated table.
    pub rows: usize,
    /// Input tokens consumed by the structuring call.
    pub input_tokens: usize,
    /// Output tokens produced by the structuring call.
    pub output_tokens: usize,
    /// Wall-clock time spent on this document.
    pub duration_ms: u64,
    /// LLM retries that were needed (0 = first attempt succeeded).
    pub retries: u32,
    /// Set when the document failed or was skipped; `None` on success.
    pub error: Option<DocumentError>,
}

impl DocumentOutcome {
    /// True when the document produced rows without error.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// True for the soft "no table in response" skip.
    pub fn skipped(&self) -> bool {
        self.error.as_ref().is_some_and(|e| e.is_soft_skip())
    }
}

/// Aggregate statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// PDFs found in the shared folder.
    pub documents_total: usize,
    /// Documents that contributed rows.
    pub documents_processed: usize,
    /// Documents that failed (render/OCR/LLM errors).
    pub documents_failed: usize,
    /// Documents skipped because the response held no table.
    pub documents_skipped: usize,
    /// Rows in the consolidated table.
    pub total_rows: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub fetch_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Machine-readable warning category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningCode {
    /// A scratch file or the scratch directory could not be deleted.
    CleanupFailed,
    /// A downloaded file was not a PDF and was ignored.
    NonPdfIgnored,
}

/// A non-fatal condition worth surfacing to the user after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunWarning {
    pub code: WarningCode,
    pub message: String,
    pub file_name: Option<String>,
}

impl RunWarning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            file_name: None,
        }
    }

    pub fn with_file(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Everything one run produced.
///
/// `table` is `None` when the folder held no PDFs, and also when every
/// document was skipped or failed — there is then no consolidated result to
/// retain or export. Per-document outcomes are always present so callers
/// can report failures alongside the successes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub table: Option<ConsolidatedTable>,
    pub documents: Vec<DocumentOutcome>,
    pub stats: RunStats,
    pub warnings: Vec<RunWarning>,
}

impl RunOutcome {
    /// True when the shared folder contained no PDF files at all.
    pub fn is_no_input(&self) -> bool {
        self.stats.documents_total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_recognises_soft_skip_only() {
        let mut outcome = DocumentOutcome {
            file_name: "a.pdf".into(),
            pages: 1,
            rows: 0,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            retries: 0,
            error: Some(DocumentError::NoTableFound {
                file_name: "a.pdf".into(),
            }),
        };
        assert!(outcome.skipped());
        assert!(!outcome.succeeded());

        outcome.error = Some(DocumentError::OcrUnavailable);
        assert!(!outcome.skipped());
    }

    #[test]
    fn no_input_when_zero_documents() {
        let outcome = RunOutcome {
            table: None,
            documents: Vec::new(),
            stats: RunStats::default(),
            warnings: Vec::new(),
        };
        assert!(outcome.is_no_input());
    }

    #[test]
    fn warning_builder_attaches_file() {
        let w = RunWarning::new(WarningCode::CleanupFailed, "file still open").with_file("a.pdf");
        assert_eq!(w.file_name.as_deref(), Some("a.pdf"));
        assert_eq!(w.code, WarningCode::CleanupFailed);
    }
}
