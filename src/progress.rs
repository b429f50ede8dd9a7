//! Progress-callback trait for per-document pipeline events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline fetches the folder and works through each
//! document.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal progress bar, a log sink, or a UI
//! without the library knowing anything about how the host application
//! communicates. The trait is `Send + Sync` so the config stays shareable
//! across threads even though documents are processed one at a time.

use std::sync::Arc;

/// Called by the extraction pipeline as it moves through a run.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Documents are processed sequentially, so events
/// for one run arrive in order.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the folder listing is fetched.
    fn on_fetch_start(&self, folder_url: &str) {
        let _ = folder_url;
    }

    /// Called once the folder has been downloaded and filtered to PDFs.
    ///
    /// `pdf_count` may be zero; the run then halts with the no-input
    /// outcome and no document events follow.
    fn on_fetch_complete(&self, pdf_count: usize) {
        let _ = pdf_count;
    }

    /// Called just before a document enters the render → OCR → LLM chain.
    ///
    /// `index` is zero-based; `total` is the PDF count for this run.
    fn on_document_start(&self, file_name: &str, index: usize, total: usize) {
        let _ = (file_name, index, total);
    }

    /// Called when a document's table rows have been parsed successfully.
    fn on_document_complete(&self, file_name: &str, index: usize, total: usize, rows: usize) {
        let _ = (file_name, index, total, rows);
    }

    /// Called when a document fails or is skipped (no table in response).
    fn on_document_error(&self, file_name: &str, index: usize, total: usize, error: &str) {
        let _ = (file_name, index, total, error);
    }

    /// Called once after all documents have been attempted.
    fn on_run_complete(&self, processed: usize, failed: usize, total_rows: usize) {
        let _ = (processed, failed, total_rows);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        fetched: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_fetch_complete(&self, pdf_count: usize) {
            self.fetched.store(pdf_count, Ordering::SeqCst);
        }

        fn on_document_start(&self, _file: &str, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _file: &str, _index: usize, _total: usize, _rows: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, _file: &str, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_fetch_start("https://example.com/folder");
        cb.on_fetch_complete(2);
        cb.on_document_start("a.pdf", 0, 2);
        cb.on_document_complete("a.pdf", 0, 2, 3);
        cb.on_document_error("b.pdf", 1, 2, "corrupt");
        cb.on_run_complete(1, 1, 3);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            fetched: AtomicUsize::new(0),
        };

        tracker.on_fetch_complete(3);
        tracker.on_document_start("a.pdf", 0, 3);
        tracker.on_document_complete("a.pdf", 0, 3, 2);
        tracker.on_document_start("b.pdf", 1, 3);
        tracker.on_document_error("b.pdf", 1, 3, "no table");
        tracker.on_document_start("c.pdf", 2, 3);
        tracker.on_document_complete("c.pdf", 2, 3, 1);

        assert_eq!(tracker.fetched.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ExtractionProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_fetch_start("url");
        cb.on_run_complete(2, 0, 4);
    }
}
