//! Structuring agent: submit extracted text to the LLM and return the raw
//! markdown response.
//!
//! This module is intentionally thin — the instruction template lives in
//! [`crate::prompts`] so it can be changed without touching retry or
//! error-handling logic here.
//!
//! ## Retry Strategy
//!
//! Hosted completion endpoints fail transiently (5xx, timeouts) often
//! enough that zero retries loses whole documents to network blips.
//! Exponential backoff (`retry_backoff_ms * 2^attempt`) avoids hammering a
//! recovering endpoint: with 500 ms base and 2 retries the wait sequence is
//! 500 ms → 1 s.

use crate::config::ExtractionConfig;
use crate::error::DocumentError;
use crate::prompts::render_invoice_prompt;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// The agent's answer for one document, with usage accounting.
#[derive(Debug, Clone)]
pub struct StructuredResponse {
    /// Raw markdown-ish response, role markers stripped.
    pub markdown: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Retries that were needed (0 = first attempt succeeded).
    pub retries: u32,
}

static RE_ROLE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*assistant\s*:\s*").unwrap());

/// Remove a leading assistant-turn prefix some completion endpoints emit.
pub fn strip_role_marker(response: &str) -> String {
    RE_ROLE_MARKER.replace(response, "").trim().to_string()
}

/// Send one document's extracted text through the structuring template.
///
/// Retries transient failures up to `config.max_retries` times with
/// exponential backoff; each attempt is bounded by `config.api_timeout_secs`.
/// Exhausted retries yield [`DocumentError::LlmFailed`].
pub async fn structure_text(
    provider: &Arc<dyn LLMProvider>,
    file_name: &str,
    extracted_text: &str,
    config: &ExtractionConfig,
) -> Result<StructuredResponse, DocumentError> {
    let prompt = render_invoice_prompt(extracted_text);
    let messages = vec![ChatMessage::user(prompt.as_str())];
    let options = build_options(config);
    let call_timeout = Duration::from_secs(config.api_timeout_secs);

    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "'{}': retry {}/{} after {}ms",
                file_name, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) => {
                debug!(
                    "'{}': {} input tokens, {} output tokens",
                    file_name, response.prompt_tokens, response.completion_tokens
                );
                return Ok(StructuredResponse {
                    markdown: strip_role_marker(&response.content),
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    retries: attempt,
                });
            }
            Ok(Err(e)) => {
                let err_msg = format!("{e}");
                warn!("'{}': attempt {} failed — {}", file_name, attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
            Err(_) => {
                let err_msg = format!("timed out after {}s", config.api_timeout_secs);
                warn!("'{}': attempt {} {}", file_name, attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
        }
    }

    Err(DocumentError::LlmFailed {
        file_name: file_name.to_string(),
        retries: config.max_retries,
        detail: last_err.unwrap_or_else(|| "unknown error".to_string()),
    })
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = ExtractionConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn strips_leading_assistant_marker() {
        assert_eq!(strip_role_marker("Assistant: | A |\n| - |"), "| A |\n| - |");
        assert_eq!(strip_role_marker("assistant:| A |"), "| A |");
        assert_eq!(strip_role_marker("  Assistant : hello"), "hello");
    }

    #[test]
    fn leaves_markerless_responses_alone() {
        assert_eq!(strip_role_marker("| A |\n| - |"), "| A |\n| - |");
        // Mid-text mentions are content, not role markers.
        assert_eq!(
            strip_role_marker("The Assistant: column is empty"),
            "The Assistant: column is empty"
        );
    }

    #[test]
    fn empty_response_stays_empty() {
        assert_eq!(strip_role_marker(""), "");
        assert_eq!(strip_role_marker("Assistant:"), "");
    }
}
