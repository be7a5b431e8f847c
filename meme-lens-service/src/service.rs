use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State, rejection::JsonRejection},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::{get, post},
};
use meme_lens::{
    AnalysisRequest, AppConfig, LlmError, OcrError, Pipeline, PipelineError, PipelineResult,
    StructuralError,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::models::{ExtractTextResponse, GenerateRequest};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

pub const CORRELATION_HEADER: &str = "x-correlation-id";

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn upstream_error(status: u16, message: &str) -> ApiError {
    (
        status_or_bad_gateway(status),
        Json(json!({
            "error": "Language model request failed",
            "status_code": status,
            "message": message
        })),
    )
}

fn status_or_bad_gateway(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Pipeline, max_upload_bytes: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            max_upload_bytes,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Pipeline::from_config(config), config.max_upload_bytes)
    }
}

pub fn create_app(config: &AppConfig) -> Router {
    build_router(AppState::from_config(config))
}

pub fn build_router(app_state: AppState) -> Router {
    let body_limit = app_state.max_upload_bytes;
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/analyze-image", post(analyze_image))
        .route("/extract-text", post(extract_text))
        .route("/extract-text-detailed", post(extract_text_detailed))
        .route("/generate", post(generate))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Tag every request with a fresh correlation id, echoed back on the response.
async fn correlation_id_middleware(mut request: Request<axum::body::Body>, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&correlation_id).ok();

    if let Some(value) = &header {
        request.headers_mut().insert(CORRELATION_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Meme Lens",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "OCR and dual-channel language model analysis estimating how likely an image is a meme",
        "endpoints": {
            "POST /analyze-image": "Full analysis (multipart: image, optional detailed=true)",
            "POST /extract-text": "OCR only",
            "POST /extract-text-detailed": "OCR with mean token confidence",
            "POST /generate": "Credibility assessment of a text ({\"text\": ...})",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn analyze_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PipelineResult>), ApiError> {
    let request = read_upload(multipart).await?;

    let result = state.pipeline.analyze(&request).await.map_err(|e| {
        error!(error = %e, "Image analysis failed");
        pipeline_error(e)
    })?;

    Ok((status_or_bad_gateway(result.status_code), Json(result)))
}

async fn extract_text(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<ExtractTextResponse> {
    let request = read_upload(multipart).await?;
    let ocr = state
        .pipeline
        .extractor()
        .extract(request.image())
        .await
        .map_err(ocr_error)?;

    Ok(Json(ExtractTextResponse {
        success: true,
        text: ocr.text,
        confidence: None,
    }))
}

async fn extract_text_detailed(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<ExtractTextResponse> {
    let request = read_upload(multipart).await?;
    let ocr = state
        .pipeline
        .extractor()
        .extract_detailed(request.image())
        .await
        .map_err(ocr_error)?;

    Ok(Json(ExtractTextResponse {
        success: true,
        text: ocr.text,
        confidence: Some(ocr.confidence.unwrap_or(0.0)),
    }))
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload.map_err(|e| {
        warn!(error = %e, "Rejected generate request");
        bad_request_error("Field \"text\" is required in the request body")
    })?;

    info!(chars = request.text.chars().count(), "Credibility request");

    match state.pipeline.credibility(&request.text).await {
        Ok(response) if response.is_success() => {
            let body = serde_json::from_str(&response.body)
                .unwrap_or_else(|_| Value::String(response.body.clone()));
            Ok(Json(body))
        }
        Ok(response) => {
            warn!(status = response.status, "Upstream rejected credibility request");
            Err(upstream_error(response.status, &response.body))
        }
        Err(e) => Err(llm_error(e)),
    }
}

/// Pull the `image` file and the optional `detailed` flag out of the form.
async fn read_upload(mut multipart: Multipart) -> Result<AnalysisRequest, ApiError> {
    let mut image: Option<(Option<String>, Vec<u8>)> = None;
    let mut detailed = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request_error(&format!("Malformed form data: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => {
                let filename = field.file_name().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request_error(&format!("Failed to read image: {e}")))?;
                image = Some((filename, bytes.to_vec()));
            }
            Some("detailed") => {
                let value = field.text().await.unwrap_or_default();
                detailed = value.trim().eq_ignore_ascii_case("true");
            }
            _ => {}
        }
    }

    let (filename, bytes) = image.ok_or_else(|| structural_error(StructuralError::MissingImage))?;
    AnalysisRequest::new(filename.as_deref(), bytes, detailed).map_err(structural_error)
}

fn structural_error(e: StructuralError) -> ApiError {
    warn!(error = %e, "Rejected upload");
    bad_request_error(&e.to_string())
}

fn pipeline_error(e: PipelineError) -> ApiError {
    match e {
        PipelineError::Structural(e) => structural_error(e),
        PipelineError::Ocr(e) => internal_error("Failed to process image", &e.to_string()),
        PipelineError::Internal(details) => internal_error("Failed to process image", &details),
    }
}

fn ocr_error(e: OcrError) -> ApiError {
    error!(error = %e, "Text extraction failed");
    match e {
        OcrError::Decode(reason) => bad_request_error(&format!("Invalid image: {reason}")),
        other => internal_error("Failed to extract text", &other.to_string()),
    }
}

fn llm_error(e: LlmError) -> ApiError {
    error!(error = %e, "Credibility request failed");
    upstream_error(e.status_code(), &e.to_string())
}
