use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ServiceError},
    middleware::json::JsonBody,
    models::{auth::AdminSession, i18n::LocalizedText},
    services::{
        ai::{load_image, ImageSource},
        gemini::{DocumentAnalysis, ImageAnalysis},
        media::{MediaService, NewMedia},
        translate::{TranslateTextRequest, TranslateTextResponse},
        tts::TtsRequest,
        vision::VisionAnnotation,
    },
    AppState,
};

const MAX_BATCH: usize = 50;

fn default_language() -> String {
    "en".into()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageRequest {
    #[serde(flatten)]
    pub image: ImageSource,
    pub prompt: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeBatchRequest {
    pub images: Vec<ImageSource>,
    pub prompt: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

/// One entry per requested image, in request order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ImageAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeDocumentRequest {
    pub text: Option<String>,
    /// `/uploads/...` or remote URL of a PDF or image.
    pub document_url: Option<String>,
    /// Base64 or data URL.
    pub document_data: Option<String>,
    pub mime_type: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

pub async fn analyze_image(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<AnalyzeImageRequest>,
) -> Result<Json<ImageAnalysis>, ApiError> {
    let image = load_image(&state.http, &state.config.uploads_dir, &body.image).await?;
    let analysis = state
        .gemini
        .analyze_image(&image, body.prompt.as_deref(), &body.language)
        .await?;
    Ok(Json(analysis))
}

/// Images are analyzed one after another; a failure is reported for its
/// item and does not stop the batch.
pub async fn analyze_batch(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<AnalyzeBatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    if body.images.is_empty() {
        return Err(ServiceError::invalid("images must not be empty").into());
    }
    if body.images.len() > MAX_BATCH {
        return Err(ServiceError::invalid(format!("At most {MAX_BATCH} images per batch")).into());
    }
    if !state.gemini.is_configured() {
        return Err(ServiceError::NotConfigured("Gemini API key").into());
    }

    let mut results = Vec::with_capacity(body.images.len());
    for (index, source) in body.images.iter().enumerate() {
        let outcome = match load_image(&state.http, &state.config.uploads_dir, source).await {
            Ok(image) => {
                state
                    .gemini
                    .analyze_image(&image, body.prompt.as_deref(), &body.language)
                    .await
            }
            Err(e) => Err(e),
        };
        results.push(match outcome {
            Ok(analysis) => BatchItem {
                index,
                success: true,
                analysis: Some(analysis),
                error: None,
            },
            Err(e) => {
                tracing::warn!(index, "batch analysis item failed: {e}");
                BatchItem {
                    index,
                    success: false,
                    analysis: None,
                    error: Some(e.to_string()),
                }
            }
        });
    }

    let succeeded = results.iter().filter(|r| r.success).count();
    Ok(Json(BatchResponse {
        failed: results.len() - succeeded,
        succeeded,
        results,
    }))
}

pub async fn analyze_document(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<AnalyzeDocumentRequest>,
) -> Result<Json<DocumentAnalysis>, ApiError> {
    let file = if body.document_url.is_some() || body.document_data.is_some() {
        let source = ImageSource {
            image_url: body.document_url.clone(),
            image_data: body.document_data.clone(),
            mime_type: body.mime_type.clone(),
        };
        Some(load_image(&state.http, &state.config.uploads_dir, &source).await?)
    } else {
        None
    };

    let analysis = state
        .gemini
        .analyze_document(body.text.as_deref(), file.as_ref(), &body.language)
        .await?;
    Ok(Json(analysis))
}

pub async fn vision_analyze(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<ImageSource>,
) -> Result<Json<VisionAnnotation>, ApiError> {
    let image = load_image(&state.http, &state.config.uploads_dir, &body).await?;
    Ok(Json(state.vision.annotate(&image).await?))
}

pub async fn translate_text(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<TranslateTextRequest>,
) -> Result<Json<TranslateTextResponse>, ApiError> {
    if body.target.trim().is_empty() {
        return Err(ServiceError::invalid("target is required").into());
    }
    let translated_text = state
        .translator
        .translate(&body.text, &body.source, &body.target)
        .await?;
    Ok(Json(TranslateTextResponse { translated_text }))
}

/// POST /tts: MP3 bytes, or with `save: true` a media record for the stored file.
pub async fn text_to_speech(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<TtsRequest>,
) -> Result<Response, ApiError> {
    let provider = state.speech.pick_provider(body.provider)?;
    let audio = state
        .speech
        .synthesize(provider, &body.text, body.voice.as_deref())
        .await?;

    if !body.save {
        return Ok((StatusCode::OK, [(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response());
    }

    let language = body.language.as_deref().unwrap_or("en");
    let caption: String = body.text.chars().take(120).collect();
    let media = MediaService::store(
        &state.db,
        &state.config.uploads_dir,
        NewMedia {
            bytes: audio,
            original_name: "speech.mp3".into(),
            content_type: "audio/mpeg".into(),
            alt: LocalizedText::new(),
            caption: LocalizedText::single(language, caption),
            tags: vec!["tts".into()],
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(media)).into_response())
}
