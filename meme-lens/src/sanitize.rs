use std::time::Duration;

use tracing::{info, warn};

use crate::llm::{GenerateRequest, LanguageModel, RequestKind, generate_with_deadline};
use crate::models::SanitizedText;
use crate::prompts::sanitize_prompt;

/// Best-effort OCR cleanup. Any failure yields the raw text with `used_fallback` set.
pub async fn sanitize_text(
    model: &dyn LanguageModel,
    raw_text: &str,
    deadline: Duration,
) -> SanitizedText {
    if raw_text.trim().is_empty() {
        return SanitizedText::fallback(raw_text);
    }

    let request = GenerateRequest::text(RequestKind::Sanitize, sanitize_prompt(raw_text));
    let response = match generate_with_deadline(model, request, deadline).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Sanitization call failed, using raw OCR text");
            return SanitizedText::fallback(raw_text);
        }
    };

    if !response.is_success() {
        warn!(
            status = response.status,
            "Sanitization returned an error status, using raw OCR text"
        );
        return SanitizedText::fallback(raw_text);
    }

    match response.first_text() {
        Some(cleaned) if !cleaned.trim().is_empty() => {
            info!(
                raw_len = raw_text.len(),
                cleaned_len = cleaned.trim().len(),
                "OCR text sanitized"
            );
            SanitizedText::cleaned(cleaned.trim())
        }
        _ => {
            warn!("Sanitization reply had no usable text, using raw OCR text");
            SanitizedText::fallback(raw_text)
        }
    }
}
