pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod fusion;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod ocr;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod sanitize;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{ConfigError, LlmError, OcrError, PipelineError, Result, StructuralError};
pub use llm::{GeminiClient, GenerateRequest, LanguageModel, LlmResponse, RequestKind};
pub use models::{
    AnalysisRequest, Channel, ChannelError, ChannelErrors, ChannelJudgment, FusedScore,
    ImageMime, OcrResult, PipelineResult, SanitizedText,
};
pub use ocr::{OcrEngine, TesseractEngine, TextExtractor};
pub use pipeline::{Pipeline, PipelineStage};
