use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::{ApiError, ServiceResult},
    middleware::auth::MaybeAdmin,
    models::tour::TourWithStops,
    services::{
        metrics::VISITOR_LOOKUPS_COUNTER,
        visitor::{ShortCodeTarget, VisitorService, VisitorStop},
    },
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct VisitorQuery {
    /// Admins may ask to see unpublished tours.
    #[serde(default)]
    pub preview: bool,
}

fn preview(query: &VisitorQuery, admin: &MaybeAdmin) -> bool {
    query.preview && admin.is_admin()
}

fn record<T>(kind: &str, result: ServiceResult<T>) -> Result<Json<T>, ApiError> {
    let status = if result.is_ok() { "found" } else { "missing" };
    VISITOR_LOOKUPS_COUNTER.with_label_values(&[kind, status]).inc();
    Ok(Json(result?))
}

/// GET /visitor/tour/{slugOrId}
pub async fn get_tour(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    Path(tour): Path<String>,
    Query(query): Query<VisitorQuery>,
) -> Result<Json<TourWithStops>, ApiError> {
    let result = VisitorService::tour(&state.db, &tour, preview(&query, &admin)).await;
    record("tour", result)
}

/// GET /visitor/tour/{slugOrId}/stop/{slugOrId}
pub async fn get_stop(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    Path((tour, stop)): Path<(String, String)>,
    Query(query): Query<VisitorQuery>,
) -> Result<Json<VisitorStop>, ApiError> {
    let result = VisitorService::stop(&state.db, &tour, &stop, preview(&query, &admin)).await;
    record("stop", result)
}

/// GET /visitor/s/{code}: what a scanned QR code points at.
pub async fn resolve_short_code(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    Path(code): Path<String>,
    Query(query): Query<VisitorQuery>,
) -> Result<Json<ShortCodeTarget>, ApiError> {
    let result = VisitorService::short_code(
        &state.db,
        &code,
        &state.config.public_base_url,
        preview(&query, &admin),
    )
    .await;
    record("short_code", result)
}
