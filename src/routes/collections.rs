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
        collection::{Collection, CreateCollectionRequest, UpdateCollectionRequest},
    },
    services::collections::CollectionService,
    AppState,
};

pub async fn list_collections(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<Collection>>, ApiError> {
    Ok(Json(CollectionService::list(&state.db).await?))
}

pub async fn get_collection(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Collection>, ApiError> {
    Ok(Json(CollectionService::get(&state.db, &id).await?))
}

pub async fn create_collection(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<CreateCollectionRequest>,
) -> Result<(StatusCode, Json<Collection>), ApiError> {
    let collection = CollectionService::create(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn update_collection(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateCollectionRequest>,
) -> Result<Json<Collection>, ApiError> {
    Ok(Json(CollectionService::update(&state.db, &id, body).await?))
}

pub async fn delete_collection(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    CollectionService::delete(&state.db, &id).await?;
    Ok(Json(json!({ "success": true })))
}
