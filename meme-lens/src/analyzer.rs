//! The two credibility channels: one over sanitized text, one over the normalized image.

use std::time::Duration;

use tracing::{info, warn};

use crate::llm::{
    GenerateRequest, InlineImage, LanguageModel, RequestKind, generate_with_deadline,
};
use crate::models::{Channel, ChannelError, ChannelOutcome, ChannelReport};
use crate::normalize::NormalizedImage;
use crate::parser::parse_judgment;
use crate::prompts::{image_channel_prompt, text_channel_prompt};

pub async fn analyze_text(
    model: &dyn LanguageModel,
    text: &str,
    deadline: Duration,
) -> ChannelOutcome {
    let request = GenerateRequest::text(RequestKind::TextChannel, text_channel_prompt(text));
    run_channel(Channel::Text, model, request, deadline).await
}

pub async fn analyze_image(
    model: &dyn LanguageModel,
    image: &NormalizedImage,
    deadline: Duration,
) -> ChannelOutcome {
    let request = GenerateRequest::text(RequestKind::ImageChannel, image_channel_prompt())
        .with_image(InlineImage::from_bytes(image.mime, &image.bytes));
    run_channel(Channel::Image, model, request, deadline).await
}

async fn run_channel(
    channel: Channel,
    model: &dyn LanguageModel,
    request: GenerateRequest,
    deadline: Duration,
) -> ChannelOutcome {
    let response = generate_with_deadline(model, request, deadline)
        .await
        .map_err(|e| {
            warn!(%channel, error = %e, "Channel request did not complete");
            ChannelError {
                status_code: e.status_code(),
                message: e.to_string(),
            }
        })?;

    if !response.is_success() {
        warn!(%channel, status = response.status, "Channel request failed");
        return Err(ChannelError {
            status_code: response.status,
            message: response.body,
        });
    }

    let raw_text = response.first_text().unwrap_or_default();
    let judgment = parse_judgment(&raw_text);
    info!(
        %channel,
        reply_len = raw_text.len(),
        structured = judgment.is_some(),
        "Channel analysis completed"
    );

    Ok(ChannelReport { judgment, raw_text })
}
