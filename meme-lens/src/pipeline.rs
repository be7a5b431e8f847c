//! Request coordinator: normalization, then OCR, then the two channels concurrently,
//! then aggregation, fusion and result assembly.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::aggregate::channel_average;
use crate::analyzer::{analyze_image, analyze_text};
use crate::config::AppConfig;
use crate::error::{LlmError, PipelineError, Result, StructuralError};
use crate::fusion::fuse;
use crate::llm::{
    GeminiClient, GenerateRequest, LanguageModel, LlmResponse, RequestKind,
    generate_with_deadline,
};
use crate::models::{
    AnalysisRequest, Channel, ChannelErrors, ChannelOutcome, OcrResult, PipelineResult,
    SanitizedText,
};
use crate::normalize::{NormalizeError, normalize_image_blocking};
use crate::ocr::{OcrEngine, TesseractEngine, TextExtractor};
use crate::prompts::credibility_prompt;
use crate::sanitize::sanitize_text;

/// Where a request currently is. Only `Assembled` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Started,
    OcrDone,
    BranchesResolved,
    Fused,
    Assembled,
    Rejected,
}

fn enter(stage: PipelineStage) {
    debug!(stage = ?stage, "Pipeline stage");
}

/// Shared, read-only collaborators. One instance serves every request.
#[derive(Clone)]
pub struct Pipeline {
    extractor: TextExtractor,
    model: Arc<dyn LanguageModel>,
    call_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        model: Arc<dyn LanguageModel>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            extractor: TextExtractor::new(ocr, call_timeout),
            model,
            call_timeout,
        }
    }

    /// Tesseract + Gemini, as configured.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(TesseractEngine::new(
                config.tesseract_cmd.clone(),
                config.ocr_languages.clone(),
            )),
            Arc::new(GeminiClient::from_config(config)),
            config.call_timeout,
        )
    }

    pub fn extractor(&self) -> &TextExtractor {
        &self.extractor
    }

    /// Single pass-through call with the credibility prompt.
    pub async fn credibility(&self, text: &str) -> std::result::Result<LlmResponse, LlmError> {
        let request = GenerateRequest::text(RequestKind::Credibility, credibility_prompt(text));
        generate_with_deadline(self.model.as_ref(), request, self.call_timeout).await
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<PipelineResult> {
        enter(PipelineStage::Started);
        info!(
            image_bytes = request.image().len(),
            mime = request.mime().as_str(),
            detailed = request.detailed(),
            "Starting image analysis"
        );

        // An undecodable upload is rejected before OCR or any model call.
        let normalized = normalize_image_blocking(request.image().to_vec(), request.mime()).await;
        let normalized = match normalized {
            Ok(normalized) => normalized,
            Err(NormalizeError::Decode(reason)) => {
                enter(PipelineStage::Rejected);
                warn!(reason = %reason, "Rejecting undecodable image");
                return Err(StructuralError::Decode(reason).into());
            }
            Err(e) => return Err(PipelineError::Internal(e.to_string())),
        };

        let ocr = if request.detailed() {
            self.extractor.extract_detailed(request.image()).await?
        } else {
            self.extractor.extract(request.image()).await?
        };
        enter(PipelineStage::OcrDone);

        let model = self.model.as_ref();
        let deadline = self.call_timeout;
        let text_branch = async {
            let sanitized = sanitize_text(model, &ocr.text, deadline).await;
            let outcome = analyze_text(model, &sanitized.text, deadline).await;
            (sanitized, outcome)
        };
        let image_branch = analyze_image(model, &normalized, deadline);

        let ((sanitized, text_outcome), image_outcome) = tokio::join!(text_branch, image_branch);
        enter(PipelineStage::BranchesResolved);

        let result = assemble(ocr, sanitized, text_outcome, image_outcome);
        enter(PipelineStage::Assembled);
        info!(
            success = result.success,
            status = result.status_code,
            final_average = ?result.scores.final_average,
            "Image analysis finished"
        );

        Ok(result)
    }
}

/// Fold both channel outcomes into the response. Never fails.
pub fn assemble(
    ocr: OcrResult,
    sanitized: SanitizedText,
    text: ChannelOutcome,
    image: ChannelOutcome,
) -> PipelineResult {
    let mut errors = ChannelErrors::default();
    let text_analysis = match text {
        Ok(report) => report.judgment,
        Err(e) => {
            errors.text_analysis = Some(e);
            None
        }
    };
    let image_analysis = match image {
        Ok(report) => report.judgment,
        Err(e) => {
            errors.image_analysis = Some(e);
            None
        }
    };

    let scores = fuse(
        channel_average(text_analysis.as_ref()),
        channel_average(image_analysis.as_ref()),
    );
    enter(PipelineStage::Fused);

    let status_code = response_status(&errors);
    PipelineResult {
        success: errors.is_empty(),
        ocr_text: ocr.text,
        ocr_confidence: ocr.confidence,
        sanitized_text: sanitized.text,
        sanitization_fallback: sanitized.used_fallback,
        text_analysis,
        image_analysis,
        scores,
        errors,
        status_code,
    }
}

/// 200 when both channels succeeded, otherwise the worse failing status.
///
/// Upstream codes outside 4xx/5xx are reported as 502 so a degraded result is
/// never mistaken for success.
pub fn response_status(errors: &ChannelErrors) -> u16 {
    [Channel::Text, Channel::Image]
        .iter()
        .filter_map(|channel| errors.get(*channel))
        .map(|e| {
            if (400..=599).contains(&e.status_code) {
                e.status_code
            } else {
                502
            }
        })
        .max()
        .unwrap_or(200)
}
