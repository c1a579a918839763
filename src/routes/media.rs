use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    middleware::json::JsonBody,
    models::{
        auth::AdminSession,
        media::{Media, MediaQuery, UpdateMediaRequest},
    },
    services::media::MediaService,
    AppState,
};

pub async fn upload_media(
    State(state): State<AppState>,
    _admin: AdminSession,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Media>), ApiError> {
    let media = MediaService::upload(&state.db, &state.config.uploads_dir, multipart).await?;
    Ok((StatusCode::CREATED, Json(media)))
}

pub async fn list_media(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(query): Query<MediaQuery>,
) -> Result<Json<Vec<Media>>, ApiError> {
    Ok(Json(MediaService::list(&state.db, &query).await?))
}

pub async fn get_media(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Media>, ApiError> {
    Ok(Json(MediaService::get(&state.db, &id).await?))
}

pub async fn update_media(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateMediaRequest>,
) -> Result<Json<Media>, ApiError> {
    Ok(Json(MediaService::update(&state.db, &id, body).await?))
}

pub async fn delete_media(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    MediaService::delete(&state.db, &state.config.uploads_dir, &id).await?;
    Ok(Json(json!({ "success": true })))
}
