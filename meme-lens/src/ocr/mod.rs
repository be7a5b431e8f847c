//! Text extraction on top of a pluggable OCR engine.

pub mod tesseract;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::OcrResult;

pub use tesseract::TesseractEngine;

/// Bytes in, text out. Implementations must fail on undecodable input.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;

    /// Raw per-token confidences as reported by the engine, including non-positive
    /// placeholders for structural rows.
    async fn token_confidences(&self, image: &[u8]) -> Result<Vec<f64>, OcrError>;
}

/// Plain and detailed extraction with a per-call deadline.
#[derive(Clone)]
pub struct TextExtractor {
    engine: Arc<dyn OcrEngine>,
    timeout: Duration,
}

impl TextExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    pub async fn extract(&self, image: &[u8]) -> Result<OcrResult, OcrError> {
        let text = self.with_deadline(self.engine.recognize(image)).await?;
        info!(
            engine = self.engine.name(),
            text_len = text.len(),
            "OCR extraction completed"
        );

        Ok(OcrResult {
            text: text.trim().to_string(),
            confidence: None,
        })
    }

    pub async fn extract_detailed(&self, image: &[u8]) -> Result<OcrResult, OcrError> {
        let (text, confidences) = tokio::try_join!(
            self.with_deadline(self.engine.recognize(image)),
            self.with_deadline(self.engine.token_confidences(image)),
        )?;

        let confidence = mean_positive_confidence(&confidences);
        info!(
            engine = self.engine.name(),
            text_len = text.len(),
            tokens = confidences.len(),
            confidence,
            "Detailed OCR extraction completed"
        );

        Ok(OcrResult {
            text: text.trim().to_string(),
            confidence: Some(confidence),
        })
    }

    async fn with_deadline<T, F>(&self, call: F) -> Result<T, OcrError>
    where
        F: std::future::Future<Output = Result<T, OcrError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| OcrError::Timeout(self.timeout))?
    }
}

/// Mean of the strictly positive confidences, rounded to two decimals; `0` if none qualify.
pub fn mean_positive_confidence(confidences: &[f64]) -> f64 {
    let positive: Vec<f64> = confidences.iter().copied().filter(|c| *c > 0.0).collect();
    if positive.is_empty() {
        debug!("No positive token confidences reported");
        return 0.0;
    }

    let mean = positive.iter().sum::<f64>() / positive.len() as f64;
    (mean * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedOcr;

    fn extractor(engine: ScriptedOcr) -> (TextExtractor, Arc<ScriptedOcr>) {
        let engine = Arc::new(engine);
        (
            TextExtractor::new(engine.clone(), Duration::from_secs(5)),
            engine,
        )
    }

    #[test]
    fn test_confidence_ignores_non_positive_tokens() {
        assert_eq!(mean_positive_confidence(&[90.0, -1.0, 70.0]), 80.0);
        assert_eq!(mean_positive_confidence(&[0.0, -1.0]), 0.0);
        assert_eq!(mean_positive_confidence(&[]), 0.0);
        assert_eq!(mean_positive_confidence(&[33.333, 33.334, 33.3]), 33.32);
    }

    #[tokio::test]
    async fn test_plain_mode_has_no_confidence() {
        let (extractor, engine) = extractor(ScriptedOcr::new("  BREAKING NEWS \n"));

        let result = extractor.extract(b"img").await.unwrap();
        assert_eq!(result.text, "BREAKING NEWS");
        assert_eq!(result.confidence, None);
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn test_detailed_mode_averages_positive_confidences() {
        let (extractor, _) =
            extractor(ScriptedOcr::new("BREAKING NEWS").with_confidences(vec![90.0, -1.0, 70.0]));

        let result = extractor.extract_detailed(b"img").await.unwrap();
        assert_eq!(result.text, "BREAKING NEWS");
        assert_eq!(result.confidence, Some(80.0));
    }

    #[tokio::test]
    async fn test_engine_failure_is_propagated() {
        let (extractor, _) = extractor(ScriptedOcr::failing("unreadable"));

        let err = extractor.extract(b"img").await.unwrap_err();
        assert!(matches!(err, OcrError::Decode(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_engine_hits_the_deadline() {
        let engine = Arc::new(ScriptedOcr::new("late").with_delay(Duration::from_secs(60)));
        let extractor = TextExtractor::new(engine, Duration::from_secs(1));

        let err = extractor.extract(b"img").await.unwrap_err();
        assert!(matches!(err, OcrError::Timeout(_)));
    }
}
