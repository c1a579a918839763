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
        stop::{CreateStopRequest, QrCodeInfo, ReorderStopsRequest, Stop, UpdateStopRequest},
        tour::TranslateTourRequest,
    },
    services::{stops::StopService, tours::TourService},
    AppState,
};

pub async fn list_stops(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(tour_id): Path<String>,
) -> Result<Json<Vec<Stop>>, ApiError> {
    TourService::get(&state.db, &tour_id).await?;
    Ok(Json(StopService::list_by_tour(&state.db, &tour_id).await?))
}

pub async fn create_stop(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(tour_id): Path<String>,
    JsonBody(body): JsonBody<CreateStopRequest>,
) -> Result<(StatusCode, Json<Stop>), ApiError> {
    let stop =
        StopService::create(&state.db, &tour_id, body, &state.config.public_base_url).await?;
    Ok((StatusCode::CREATED, Json(stop)))
}

pub async fn reorder_stops(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(tour_id): Path<String>,
    JsonBody(body): JsonBody<ReorderStopsRequest>,
) -> Result<Json<Vec<Stop>>, ApiError> {
    Ok(Json(
        StopService::reorder(&state.db, &tour_id, &body.stop_ids).await?,
    ))
}

pub async fn get_stop(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Stop>, ApiError> {
    Ok(Json(StopService::get(&state.db, &id).await?))
}

pub async fn update_stop(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateStopRequest>,
) -> Result<Json<Stop>, ApiError> {
    let stop = StopService::update(&state.db, &id, body, &state.config.public_base_url).await?;
    Ok(Json(stop))
}

pub async fn delete_stop(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    StopService::delete(&state.db, &id).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /stops/{id}/qr: new short code; old printed codes stop working.
pub async fn regenerate_qr(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<QrCodeInfo>, ApiError> {
    let info = StopService::regenerate_qr(&state.db, &id, &state.config.public_base_url).await?;
    Ok(Json(info))
}

pub async fn translate_stop(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<TranslateTourRequest>,
) -> Result<Json<Stop>, ApiError> {
    let stop = state
        .translator
        .translate_stop(&state.db, &id, &body.target_languages, body.overwrite)
        .await?;
    Ok(Json(stop))
}
