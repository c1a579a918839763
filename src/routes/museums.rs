use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    middleware::json::JsonBody,
    models::{
        auth::AdminSession,
        museum::{CreateTemplateRequest, Museum, MuseumRequest, Template},
    },
    services::museums::{MuseumService, TemplateService},
    AppState,
};

pub async fn list_museums(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<Museum>>, ApiError> {
    Ok(Json(MuseumService::list(&state.db).await?))
}

pub async fn get_museum(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Museum>, ApiError> {
    Ok(Json(MuseumService::get(&state.db, &id).await?))
}

pub async fn create_museum(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<MuseumRequest>,
) -> Result<(StatusCode, Json<Museum>), ApiError> {
    let museum = MuseumService::create(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(museum)))
}

pub async fn update_museum(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<MuseumRequest>,
) -> Result<Json<Museum>, ApiError> {
    Ok(Json(MuseumService::update(&state.db, &id, body).await?))
}

pub async fn delete_museum(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    MuseumService::delete(&state.db, &id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_templates(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<Template>>, ApiError> {
    Ok(Json(TemplateService::list(&state.db).await?))
}

pub async fn get_template(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Template>, ApiError> {
    Ok(Json(TemplateService::get(&state.db, &id).await?))
}

pub async fn create_template(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<Template>), ApiError> {
    let template = TemplateService::create(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// Built-in templates answer 400.
pub async fn delete_template(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    TemplateService::delete(&state.db, &id).await?;
    Ok(Json(json!({ "success": true })))
}
