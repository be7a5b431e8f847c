//! Scripted collaborators for tests. Enabled by the `testing` feature.

use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use serde_json::json;

use crate::error::{LlmError, OcrError};
use crate::llm::{GenerateRequest, LanguageModel, LlmResponse, RequestKind};
use crate::ocr::OcrEngine;

/// OCR engine returning fixed text and token confidences.
pub struct ScriptedOcr {
    text: String,
    confidences: Vec<f64>,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedOcr {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidences: Vec::new(),
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with [`OcrError::Decode`].
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new("")
        }
    }

    pub fn with_confidences(mut self, confidences: Vec<f64>) -> Self {
        self.confidences = confidences;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(OcrError::Decode(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        self.enter().await?;
        Ok(self.text.clone())
    }

    async fn token_confidences(&self, _image: &[u8]) -> Result<Vec<f64>, OcrError> {
        self.enter().await?;
        Ok(self.confidences.clone())
    }
}

type Responder = Box<dyn Fn(&GenerateRequest) -> Result<LlmResponse, LlmError> + Send + Sync>;

/// Language model answering through a closure and recording every request.
pub struct ScriptedModel {
    responder: Responder,
    delays: Vec<(RequestKind, Duration)>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedModel {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&GenerateRequest) -> Result<LlmResponse, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delays: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Same reply for every request.
    pub fn replying(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::new(move |_| {
            Ok(LlmResponse {
                status,
                body: body.clone(),
            })
        })
    }

    /// Hold requests of `kind` for `delay` before answering.
    pub fn with_delay(mut self, kind: RequestKind, delay: Duration) -> Self {
        self.delays.push((kind, delay));
        self
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.requests().len()
    }

    pub fn calls_for(&self, kind: RequestKind) -> usize {
        self.requests().iter().filter(|r| r.kind == kind).count()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: GenerateRequest) -> Result<LlmResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some((_, delay)) = self.delays.iter().find(|(kind, _)| *kind == request.kind) {
            tokio::time::sleep(*delay).await;
        }
        (self.responder)(&request)
    }
}

/// Minimal successful `generateContent` body carrying `text`.
pub fn gemini_envelope(text: &str) -> String {
    json!({
        "candidates": [
            { "content": { "role": "model", "parts": [ { "text": text } ] } }
        ]
    })
    .to_string()
}

pub fn ok_reply(text: &str) -> LlmResponse {
    LlmResponse {
        status: 200,
        body: gemini_envelope(text),
    }
}

pub fn error_reply(status: u16, body: &str) -> LlmResponse {
    LlmResponse {
        status,
        body: body.to_string(),
    }
}

/// A small decodable PNG.
pub fn sample_png() -> Vec<u8> {
    let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 12) as u8, (y * 12) as u8, 128]));
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .expect("encode sample png");
    out
}
