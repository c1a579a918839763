use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    middleware::json::JsonBody,
    models::{
        auth::AdminSession,
        tour::{
            CreateTourRequest, Tour, TourQuery, TourStatus, TourWithStops, TranslateTourRequest,
            UpdateTourRequest,
        },
    },
    services::{tours::TourService, translate::TranslationReport},
    AppState,
};

pub async fn list_tours(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(query): Query<TourQuery>,
) -> Result<Json<Vec<Tour>>, ApiError> {
    Ok(Json(TourService::list(&state.db, &query).await?))
}

pub async fn get_tour(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<TourWithStops>, ApiError> {
    Ok(Json(TourService::get_with_stops(&state.db, &id).await?))
}

pub async fn create_tour(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<CreateTourRequest>,
) -> Result<(StatusCode, Json<Tour>), ApiError> {
    let tour = TourService::create(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(tour)))
}

pub async fn update_tour(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateTourRequest>,
) -> Result<Json<Tour>, ApiError> {
    Ok(Json(TourService::update(&state.db, &id, body).await?))
}

pub async fn delete_tour(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    TourService::delete(&state.db, &id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn duplicate_tour(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<TourWithStops>), ApiError> {
    let copy = TourService::duplicate(&state.db, &id, &state.config.public_base_url).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

pub async fn publish_tour(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Tour>, ApiError> {
    let tour = TourService::set_status(&state.db, &id, TourStatus::Published).await?;
    tracing::info!(tour_id = %tour.id, version = tour.version, "tour published");
    Ok(Json(tour))
}

/// Back to draft; visitors stop seeing the tour.
pub async fn unpublish_tour(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Tour>, ApiError> {
    Ok(Json(TourService::set_status(&state.db, &id, TourStatus::Draft).await?))
}

pub async fn translate_tour(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<TranslateTourRequest>,
) -> Result<Json<TranslationReport>, ApiError> {
    let report = state
        .translator
        .translate_tour(&state.db, &id, &body.target_languages, body.overwrite)
        .await?;
    Ok(Json(report))
}
