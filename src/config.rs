//! Configuration types for the invoice extraction pipeline.
//!
//! All run behaviour is controlled through [`ExtractionConfig`], built via
//! its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across runs, serialise them for logging, and
//! diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely
//! on well-documented defaults for the rest.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one batch extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use invoice2csv::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .model("gpt-4.1-nano")
///     .max_retries(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 300.
    ///
    /// 300 DPI (a 300/72 ≈ 4.17× scale over the PDF's 72-DPI base) is the
    /// conventional sweet spot for Tesseract: small invoice print resolves
    /// cleanly without producing multi-hundred-megabyte page bitmaps.
    pub dpi: u32,

    /// JPEG quality for rendered page images. Range: 1–100. Default: 85.
    ///
    /// Page images exist only long enough to be OCR'd, so moderate lossy
    /// compression keeps peak memory low; Tesseract accuracy is flat above
    /// roughly quality 80 for rendered (non-photographic) text.
    pub jpeg_quality: u8,

    /// LLM model identifier, e.g. "gpt-4.1-nano".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the structuring call. Default: 0.2.
    ///
    /// Low temperature keeps the model faithful to what the OCR text
    /// actually says — exactly what you want when the output feeds a
    /// spreadsheet rather than a reader.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per document. Default: 4096.
    ///
    /// A multi-invoice document can produce dozens of table rows; 4096
    /// covers that comfortably while keeping per-document cost predictable.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient LLM API failure. Default: 2.
    ///
    /// Hosted completion endpoints fail transiently often enough that zero
    /// retries loses whole documents to network blips. Two bounded retries
    /// catch the vast majority; permanent errors (bad API key) surface as
    /// [`crate::error::DocumentError`] once the attempts are exhausted.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Tesseract language code passed to the OCR engine. Default: "eng".
    pub ocr_language: String,

    /// Marker substituted for missing or empty cells. Default: "-".
    pub placeholder: String,

    /// Abort the whole batch on the first document failure. Default: false.
    ///
    /// Off by default: one corrupt PDF should not void the other nineteen.
    /// Turn it on to reproduce strict all-or-nothing semantics.
    pub fail_fast: bool,

    /// Keep the scratch directory (downloads + per-document invoice.md)
    /// after the run instead of deleting it. Default: false.
    pub keep_scratch: bool,

    /// Scratch directory override. If None, a fresh `tempfile::TempDir`
    /// is used per run.
    pub scratch_dir: Option<PathBuf>,

    /// Download timeout per HTTP request in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-LLM-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Optional progress callback receiving per-document events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            jpeg_quality: 85,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 4096,
            max_retries: 2,
            retry_backoff_ms: 500,
            ocr_language: "eng".to_string(),
            placeholder: "-".to_string(),
            fail_fast: false,
            keep_scratch: false,
            scratch_dir: None,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("ocr_language", &self.ocr_language)
            .field("placeholder", &self.placeholder)
            .field("fail_fast", &self.fail_fast)
            .field("keep_scratch", &self.keep_scratch)
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Rasterisation scale factor over the PDF's 72-DPI base.
    pub fn render_scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn placeholder(mut self, marker: impl Into<String>) -> Self {
        self.config.placeholder = marker.into();
        self
    }

    pub fn fail_fast(mut self, v: bool) -> Self {
        self.config.fail_fast = v;
        self
    }

    pub fn keep_scratch(mut self, v: bool) -> Self {
        self.config.keep_scratch = v;
        self
    }

    pub fn scratch_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(ExtractError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.ocr_language.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dpi_gives_standard_scale() {
        let config = ExtractionConfig::default();
        assert_eq!(config.dpi, 300);
        // 300 DPI over the 72-DPI PDF base is a ~4.1667× scale
        assert!((config.render_scale() - 4.1667).abs() < 0.001);
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let config = ExtractionConfig::builder()
            .dpi(10_000)
            .jpeg_quality(200)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(config.dpi, 600);
        assert_eq!(config.jpeg_quality, 100);
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn build_rejects_empty_ocr_language() {
        let err = ExtractionConfig::builder()
            .ocr_language("")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("OCR language"));
    }

    #[test]
    fn placeholder_defaults_to_dash() {
        assert_eq!(ExtractionConfig::default().placeholder, "-");
    }
}
