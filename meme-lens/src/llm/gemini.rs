//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use super::{GenerateRequest, LanguageModel, LlmResponse};
use crate::config::AppConfig;
use crate::error::LlmError;

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: GeminiInlineData<'a> },
}

#[derive(Debug, Serialize)]
struct GeminiInlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.gemini_api_key.clone(),
            &config.gemini_base_url,
            &config.gemini_model,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn build_payload(request: &GenerateRequest) -> GeminiRequest<'_> {
    let mut parts = vec![GeminiPart::Text {
        text: &request.prompt,
    }];
    if let Some(image) = &request.image {
        parts.push(GeminiPart::InlineData {
            inline_data: GeminiInlineData {
                mime_type: image.mime.as_str(),
                data: &image.base64,
            },
        });
    }

    GeminiRequest {
        contents: vec![GeminiContent { parts }],
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<LlmResponse, LlmError> {
        debug!(
            kind = request.kind.as_str(),
            prompt_len = request.prompt.len(),
            has_image = request.image.is_some(),
            "Sending request to Gemini"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("X-goog-api-key", &self.api_key)
            .json(&build_payload(&request))
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if status != 200 {
            warn!(kind = request.kind.as_str(), status, "Gemini returned an error status");
        }

        Ok(LlmResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{InlineImage, RequestKind};
    use crate::models::ImageMime;

    #[test]
    fn test_endpoint_is_built_from_model() {
        let client = GeminiClient::new("key", "https://example.test/v1beta/", "gemini-2.0-flash");
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_text_only_payload_has_one_part() {
        let request = GenerateRequest::text(RequestKind::TextChannel, "analyse this");
        let payload = serde_json::to_value(build_payload(&request)).unwrap();

        assert_eq!(
            payload,
            serde_json::json!({"contents": [{"parts": [{"text": "analyse this"}]}]})
        );
    }

    #[test]
    fn test_image_goes_in_second_part() {
        let request = GenerateRequest::text(RequestKind::ImageChannel, "look")
            .with_image(InlineImage::from_bytes(ImageMime::Jpeg, b"abc"));
        let payload = serde_json::to_value(build_payload(&request)).unwrap();

        let parts = &payload["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "look");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "YWJj");
    }
}
