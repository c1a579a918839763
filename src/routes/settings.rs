use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{error::ApiError, middleware::json::JsonBody, models::auth::AdminSession, AppState};

/// GET /settings: public; the visitor app reads branding and map settings.
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let mut settings = state.settings.get().await?;
    // Browser map key, restricted by referrer on Google's side.
    if let Some(key) = &state.config.google_maps_api_key {
        if let Some(maps) = settings.get_mut("maps").and_then(Value::as_object_mut) {
            maps.insert("googleMapsApiKey".into(), json!(key));
        }
    }
    Ok(Json(settings))
}

/// PUT /settings: replace the stored document.
pub async fn replace_settings(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let settings = state.settings.replace(body).await?;
    tracing::info!("settings replaced");
    Ok(Json(settings))
}

/// PATCH /settings: deep merge, `null` deletes.
pub async fn patch_settings(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.settings.patch(body).await?))
}

/// GET /services/status: which third-party integrations have credentials.
pub async fn services_status(State(state): State<AppState>, _admin: AdminSession) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "gemini": { "configured": state.gemini.is_configured(), "model": config.gemini_model },
        "googleVision": { "configured": state.vision.is_configured() },
        "googleMaps": { "configured": config.google_maps_api_key.is_some() },
        "deepgram": { "configured": state.speech.deepgram_configured() },
        "elevenlabs": { "configured": state.speech.elevenlabs_configured() },
        "libretranslate": {
            "configured": true,
            "url": config.libretranslate_url,
            "apiKey": config.libretranslate_api_key.is_some(),
        },
        "auth": { "required": config.auth_required() },
    }))
}
