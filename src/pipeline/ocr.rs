//! Text extraction: run Tesseract over each rendered page image.
//!
//! Two implementations exist: the real engine when the `ocr` feature is
//! enabled, and a stub that returns a typed error when it's not. This
//! avoids linking to the system leptonica/tesseract libraries on machines
//! where they're not installed.
//!
//! Page texts are joined with `\n` in ascending page order. Empty output
//! for a page is passed through unchanged; the structuring agent sees
//! whatever the engine produced.

use crate::config::ExtractionConfig;
use crate::error::DocumentError;
use crate::pipeline::render::PageImage;

#[cfg(feature = "ocr")]
mod real {
    use super::*;
    use leptess::LepTess;
    use tracing::debug;

    /// OCR every page image and join the per-page texts in page order.
    ///
    /// Tesseract is CPU-bound and not async-aware, so the whole document's
    /// pages run inside one `spawn_blocking` call.
    pub async fn extract_text(
        file_name: &str,
        pages: Vec<PageImage>,
        config: &ExtractionConfig,
    ) -> Result<String, DocumentError> {
        let name = file_name.to_string();
        let lang = config.ocr_language.clone();

        tokio::task::spawn_blocking(move || extract_text_blocking(&name, &pages, &lang))
            .await
            .unwrap_or_else(|e| {
                Err(DocumentError::OcrFailed {
                    file_name: file_name.to_string(),
                    page: 0,
                    detail: format!("OCR task panicked: {e}"),
                })
            })
    }

    fn extract_text_blocking(
        file_name: &str,
        pages: &[PageImage],
        lang: &str,
    ) -> Result<String, DocumentError> {
        let mut engine =
            LepTess::new(None, lang).map_err(|e| DocumentError::OcrFailed {
                file_name: file_name.to_string(),
                page: 0,
                detail: format!("tesseract init ({lang}): {e}"),
            })?;

        let mut page_texts = Vec::with_capacity(pages.len());

        for (idx, jpeg_bytes) in pages {
            engine
                .set_image_from_mem(jpeg_bytes)
                .map_err(|e| DocumentError::OcrFailed {
                    file_name: file_name.to_string(),
                    page: idx + 1,
                    detail: format!("image decode: {e}"),
                })?;

            let text = engine
                .get_utf8_text()
                .map_err(|e| DocumentError::OcrFailed {
                    file_name: file_name.to_string(),
                    page: idx + 1,
                    detail: format!("recognition: {e}"),
                })?;

            debug!("OCR page {}: {} chars", idx + 1, text.len());
            page_texts.push(text);
        }

        Ok(page_texts.join("\n"))
    }
}

#[cfg(not(feature = "ocr"))]
mod stub {
    use super::*;

    pub async fn extract_text(
        _file_name: &str,
        _pages: Vec<PageImage>,
        _config: &ExtractionConfig,
    ) -> Result<String, DocumentError> {
        Err(DocumentError::OcrUnavailable)
    }
}

#[cfg(feature = "ocr")]
pub use real::extract_text;
#[cfg(not(feature = "ocr"))]
pub use stub::extract_text;

#[cfg(test)]
mod tests {
    #[cfg(not(feature = "ocr"))]
    #[test]
    fn stub_reports_ocr_unavailable() {
        use super::*;
        let config = ExtractionConfig::default();
        let err = tokio_test::block_on(extract_text("a.pdf", Vec::new(), &config)).unwrap_err();
        assert!(matches!(err, DocumentError::OcrUnavailable));
    }

    #[cfg(feature = "ocr")]
    #[test]
    fn empty_document_joins_to_empty_text() {
        use super::*;
        // Zero pages exercise the join without touching the engine binary
        // data path.
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run OCR engine tests");
            return;
        }
        let config = ExtractionConfig::default();
        let text = tokio_test::block_on(extract_text("a.pdf", Vec::new(), &config)).unwrap();
        assert!(text.is_empty());
    }
}
