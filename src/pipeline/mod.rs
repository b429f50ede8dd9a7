//! Pipeline stages for folder-to-CSV invoice extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch the OCR engine) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ render ──▶ ocr ──▶ llm ──▶ parse
//! (folder)  (pdfium)  (tesseract) (LLM) (markdown table)
//! ```
//!
//! 1. [`fetch`]  — download every file in the shared folder to scratch,
//!    filter to PDFs
//! 2. [`render`] — rasterise all pages to JPEG; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`ocr`]    — Tesseract per page image, newline-joined in page order
//! 4. [`llm`]    — drive the structuring call with retry/backoff; one of
//!    the two stages with network I/O
//! 5. [`parse`]  — locate markdown table blocks in the model response

pub mod fetch;
pub mod llm;
pub mod ocr;
pub mod parse;
pub mod render;
