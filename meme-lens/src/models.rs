use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StructuralError;

/// Image formats accepted on upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMime {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
}

impl ImageMime {
    /// Infer from the uploaded filename; anything that is not `.png` is treated as jpeg.
    pub fn from_filename(filename: &str) -> Self {
        match filename.rsplit_once('.') {
            Some((_, ext)) if ext.eq_ignore_ascii_case("png") => ImageMime::Png,
            _ => ImageMime::Jpeg,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            ImageMime::Jpeg => image::ImageFormat::Jpeg,
            ImageMime::Png => image::ImageFormat::Png,
        }
    }
}

/// One inbound analysis call. Built only through [`AnalysisRequest::new`].
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    image: Vec<u8>,
    mime: ImageMime,
    detailed: bool,
}

impl AnalysisRequest {
    /// Validate an uploaded file. `filename` is `None` when the form part carried no name.
    pub fn new(
        filename: Option<&str>,
        image: Vec<u8>,
        detailed: bool,
    ) -> Result<Self, StructuralError> {
        let filename = filename.unwrap_or_default();
        if filename.is_empty() {
            return Err(StructuralError::EmptyFilename);
        }
        if image.is_empty() {
            return Err(StructuralError::EmptyImage);
        }

        Ok(Self {
            image,
            mime: ImageMime::from_filename(filename),
            detailed,
        })
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn mime(&self) -> ImageMime {
        self.mime
    }

    pub fn detailed(&self) -> bool {
        self.detailed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub text: String,
    /// Mean of the positive token confidences, only filled in detailed mode.
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedText {
    pub text: String,
    pub used_fallback: bool,
}

impl SanitizedText {
    pub fn cleaned(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            used_fallback: false,
        }
    }

    pub fn fallback(raw: impl Into<String>) -> Self {
        Self {
            text: raw.into(),
            used_fallback: true,
        }
    }
}

/// Whatever JSON the model returned for a channel.
///
/// The shape is not validated; aggregation walks it generically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelJudgment(pub Value);

impl ChannelJudgment {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// The two analysis paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Text,
    Image,
}

impl Channel {
    /// Key used for this channel in result payloads.
    pub fn key(&self) -> &'static str {
        match self {
            Channel::Text => "text_analysis",
            Channel::Image => "image_analysis",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Text => f.write_str("text"),
            Channel::Image => f.write_str("image"),
        }
    }
}

/// Record of a failed channel, kept in the result instead of being propagated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelError {
    pub status_code: u16,
    pub message: String,
}

/// Successful channel call. `judgment` is `None` when the reply had no JSON in it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReport {
    pub judgment: Option<ChannelJudgment>,
    pub raw_text: String,
}

pub type ChannelOutcome = Result<ChannelReport, ChannelError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusedScore {
    pub text_average: Option<f64>,
    pub image_average: Option<f64>,
    pub image_average_weighted: Option<f64>,
    pub final_average: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_analysis: Option<ChannelError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_analysis: Option<ChannelError>,
}

impl ChannelErrors {
    pub fn is_empty(&self) -> bool {
        self.text_analysis.is_none() && self.image_analysis.is_none()
    }

    pub fn get(&self, channel: Channel) -> Option<&ChannelError> {
        match channel {
            Channel::Text => self.text_analysis.as_ref(),
            Channel::Image => self.image_analysis.as_ref(),
        }
    }
}

/// Response body of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub ocr_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_confidence: Option<f64>,
    pub sanitized_text: String,
    pub sanitization_fallback: bool,
    pub text_analysis: Option<ChannelJudgment>,
    pub image_analysis: Option<ChannelJudgment>,
    pub scores: FusedScore,
    #[serde(default, skip_serializing_if = "ChannelErrors::is_empty")]
    pub errors: ChannelErrors,
    /// HTTP status the caller should answer with.
    #[serde(skip)]
    pub status_code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_is_inferred_from_extension() {
        assert_eq!(ImageMime::from_filename("cat.PNG"), ImageMime::Png);
        assert_eq!(ImageMime::from_filename("cat.jpeg"), ImageMime::Jpeg);
        assert_eq!(ImageMime::from_filename("no_extension"), ImageMime::Jpeg);
        assert_eq!(ImageMime::from_filename("weird.webp"), ImageMime::Jpeg);
    }

    #[test]
    fn test_request_rejects_empty_parts() {
        assert_eq!(
            AnalysisRequest::new(Some(""), vec![1], false).unwrap_err(),
            StructuralError::EmptyFilename
        );
        assert_eq!(
            AnalysisRequest::new(None, vec![1], false).unwrap_err(),
            StructuralError::EmptyFilename
        );
        assert_eq!(
            AnalysisRequest::new(Some("a.png"), Vec::new(), false).unwrap_err(),
            StructuralError::EmptyImage
        );

        let request = AnalysisRequest::new(Some("a.png"), vec![1, 2], true).unwrap();
        assert_eq!(request.mime(), ImageMime::Png);
        assert!(request.detailed());
    }

    #[test]
    fn test_errors_are_omitted_when_empty() {
        let result = PipelineResult {
            success: true,
            ocr_text: "hi".into(),
            ocr_confidence: None,
            sanitized_text: "hi".into(),
            sanitization_fallback: false,
            text_analysis: None,
            image_analysis: None,
            scores: FusedScore::default(),
            errors: ChannelErrors::default(),
            status_code: 200,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("errors").is_none());
        assert!(json.get("ocr_confidence").is_none());
        assert!(json.get("status_code").is_none());
        assert!(json["scores"]["final_average"].is_null());
    }
}
