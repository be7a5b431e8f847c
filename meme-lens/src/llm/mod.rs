//! Language model capability: prompt (plus optional image) in, raw HTTP reply out.

pub mod gemini;

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;

use crate::error::LlmError;
use crate::models::ImageMime;

pub use gemini::GeminiClient;

/// What a request is for. Only used for logging and routing in test doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Sanitize,
    TextChannel,
    ImageChannel,
    Credibility,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Sanitize => "sanitize",
            RequestKind::TextChannel => "text_channel",
            RequestKind::ImageChannel => "image_channel",
            RequestKind::Credibility => "credibility",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime: ImageMime,
    pub base64: String,
}

impl InlineImage {
    pub fn from_bytes(mime: ImageMime, bytes: &[u8]) -> Self {
        Self {
            mime,
            base64: STANDARD.encode(bytes),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub kind: RequestKind,
    pub prompt: String,
    pub image: Option<InlineImage>,
}

impl GenerateRequest {
    pub fn text(kind: RequestKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }
}

/// Upstream reply as received; the body is kept verbatim for error reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    pub status: u16,
    pub body: String,
}

impl LlmResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// First text part of the first candidate, if the envelope has one.
    pub fn first_text(&self) -> Option<String> {
        first_candidate_text(&self.body)
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<LlmResponse, LlmError>;
}

/// Call `model` and give up after `deadline`; dropping the future cancels the request.
pub async fn generate_with_deadline(
    model: &dyn LanguageModel,
    request: GenerateRequest,
    deadline: Duration,
) -> Result<LlmResponse, LlmError> {
    tokio::time::timeout(deadline, model.generate(request))
        .await
        .map_err(|_| LlmError::Timeout(deadline))?
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub fn first_candidate_text(body: &str) -> Option<String> {
    let envelope: Envelope = serde_json::from_str(body).ok()?;
    envelope
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .find_map(|part| part.text)
}
