//! Tesseract OCR via the command-line binary.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::OcrEngine;
use crate::error::OcrError;

/// Engine mode 3 (default LSTM) with a single uniform text block layout.
const ENGINE_ARGS: [&str; 4] = ["--oem", "3", "--psm", "6"];

pub struct TesseractEngine {
    command: String,
    languages: String,
}

impl TesseractEngine {
    pub fn new(command: impl Into<String>, languages: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            languages: languages.into(),
        }
    }

    async fn run(&self, image: &[u8], extra: &[&str]) -> Result<String, OcrError> {
        let format = image::guess_format(image).map_err(|e| OcrError::Decode(e.to_string()))?;
        let suffix = format
            .extensions_str()
            .first()
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let input = tempfile::Builder::new()
            .prefix("meme-lens-")
            .suffix(&suffix)
            .tempfile()?
            .into_temp_path();
        tokio::fs::write(&input, image).await?;

        debug!(command = %self.command, languages = %self.languages, ?extra, "Running tesseract");

        let output = Command::new(&self.command)
            .arg(&*input)
            .arg("stdout")
            .args(ENGINE_ARGS)
            .args(["-l", &self.languages])
            .args(extra)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(status = ?output.status.code(), stderr = %stderr, "tesseract failed");
                Err(OcrError::Failed(format!("tesseract failed: {}", stderr.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrError::EngineUnavailable(format!("{} not found (install tesseract-ocr)", self.command)),
            ),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        self.run(image, &[]).await
    }

    async fn token_confidences(&self, image: &[u8]) -> Result<Vec<f64>, OcrError> {
        let tsv = self.run(image, &["tsv"]).await?;
        Ok(parse_tsv_confidences(&tsv))
    }
}

/// Pull the `conf` column out of tesseract's TSV output.
///
/// Rows that don't parse are skipped; non-word rows carry `-1` and are kept
/// so the caller decides what counts.
pub fn parse_tsv_confidences(tsv: &str) -> Vec<f64> {
    let mut lines = tsv.lines();
    let conf_index = lines
        .next()
        .and_then(|header| header.split('\t').position(|col| col.trim() == "conf"))
        .unwrap_or(10);

    lines
        .filter_map(|line| line.split('\t').nth(conf_index))
        .filter_map(|conf| conf.trim().parse::<f64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t
5\t1\t1\t1\t1\t1\t36\t92\t120\t30\t96.063751\tBREAKING
5\t1\t1\t1\t1\t2\t170\t92\t90\t30\t91\tNEWS
";

    #[test]
    fn test_reads_conf_column_by_header() {
        let confs = parse_tsv_confidences(SAMPLE_TSV);
        assert_eq!(confs, vec![-1.0, 96.063751, 91.0]);
    }

    #[test]
    fn test_empty_output_has_no_tokens() {
        assert!(parse_tsv_confidences("").is_empty());
        assert!(parse_tsv_confidences("level\tconf\ttext\n").is_empty());
    }

    #[tokio::test]
    async fn test_non_image_bytes_fail_before_spawning() {
        let engine = TesseractEngine::new("definitely-not-installed-tesseract", "por+eng");
        let err = engine.recognize(b"plain text").await.unwrap_err();
        assert!(matches!(err, OcrError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        // Minimal valid PNG signature + IHDR header is enough for format sniffing.
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        let engine = TesseractEngine::new("definitely-not-installed-tesseract", "por+eng");
        let err = engine.recognize(&png).await.unwrap_err();
        assert!(matches!(err, OcrError::EngineUnavailable(_)));
    }
}
