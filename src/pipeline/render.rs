//! PDF rasterisation: render every page to JPEG bytes via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto the blocking
//! thread pool so the Tokio worker threads don't stall during CPU-heavy
//! rendering.
//!
//! ## Handle lifetime
//!
//! The `PdfDocument` lives only inside the blocking closure; it is dropped
//! on every exit path, so the file handle is released even when a page
//! fails to render.

use crate::config::ExtractionConfig;
use crate::error::DocumentError;
use image::codecs::jpeg::JpegEncoder;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// A rendered page: zero-based index plus JPEG-encoded pixels.
pub type PageImage = (usize, Vec<u8>);

/// Rasterise every page of a PDF into JPEG images, in page order.
///
/// Failures are per-document: a corrupt or encrypted PDF yields
/// [`DocumentError::RenderFailed`] and the caller decides whether the
/// batch continues.
pub async fn render_document(
    pdf_path: &Path,
    config: &ExtractionConfig,
) -> Result<Vec<PageImage>, DocumentError> {
    let path = pdf_path.to_path_buf();
    let file_name = display_name(pdf_path);
    let scale = config.render_scale();
    let quality = config.jpeg_quality;

    tokio::task::spawn_blocking(move || render_document_blocking(&path, scale, quality))
        .await
        .unwrap_or_else(|e| {
            Err(DocumentError::RenderFailed {
                file_name: String::new(),
                detail: format!("render task panicked: {e}"),
            })
        })
        .map_err(|e| match e {
            DocumentError::RenderFailed { detail, .. } => DocumentError::RenderFailed {
                file_name: file_name.clone(),
                detail,
            },
            other => other,
        })
}

/// Blocking implementation of page rendering.
fn render_document_blocking(
    pdf_path: &Path,
    scale: f32,
    jpeg_quality: u8,
) -> Result<Vec<PageImage>, DocumentError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| DocumentError::RenderFailed {
            file_name: String::new(),
            detail: format!("{e:?}"),
        })?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let page_count = document.pages().len() as usize;
    debug!("PDF loaded: {} pages", page_count);

    let mut results = Vec::with_capacity(page_count);

    for (idx, page) in document.pages().iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| DocumentError::RenderFailed {
                file_name: String::new(),
                detail: format!("page {}: {e:?}", idx + 1),
            })?;

        // JPEG carries no alpha channel; flatten before encoding.
        let image = bitmap.as_image().to_rgb8();
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), jpeg_quality);
        image
            .write_with_encoder(encoder)
            .map_err(|e| DocumentError::RenderFailed {
                file_name: String::new(),
                detail: format!("page {}: JPEG encoding failed: {e}", idx + 1),
            })?;

        debug!(
            "Rendered page {} → {}x{} px, {} bytes jpeg",
            idx + 1,
            image.width(),
            image.height(),
            bytes.len()
        );
        results.push((idx, bytes));
    }

    Ok(results)
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
