use std::time::Duration;

use thiserror::Error;

/// Request-shape problems that reject an analysis before any external call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("No image was sent. Use the \"image\" key in the form data.")]
    MissingImage,

    #[error("No file was selected.")]
    EmptyFilename,

    #[error("Image file is empty.")]
    EmptyImage,

    #[error("Invalid image: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    #[error("OCR failed: {0}")]
    Failed(String),

    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures that happen before an HTTP status is available.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Language model request failed: {0}")]
    Transport(String),

    #[error("Language model request timed out after {0:?}")]
    Timeout(Duration),
}

impl LlmError {
    /// Status reported for a channel that never got an upstream response.
    pub fn status_code(&self) -> u16 {
        match self {
            LlmError::Transport(_) => 502,
            LlmError::Timeout(_) => 504,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not found in environment variables")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Fatal pipeline errors. Channel failures are not represented here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
