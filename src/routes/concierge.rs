use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    middleware::{auth::MaybeAdmin, json::JsonBody},
    models::{
        auth::AdminSession,
        concierge::{
            ChatRequest, ChatResponse, ConciergeBundle, ConciergeConfig, ConciergeKnowledge,
            ConciergeQuickAction, ConfigScope, KnowledgeRequest, QuickActionRequest,
            TranslateQuickActionsRequest, UpdateConciergeConfigRequest,
        },
    },
    services::concierge::ConciergeService,
    AppState,
};

/// GET /concierge/config: public so the visitor app can show the welcome
/// message and quick actions; knowledge is only included for admins.
pub async fn get_config(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    Query(scope): Query<ConfigScope>,
) -> Result<Json<ConciergeBundle>, ApiError> {
    let mut bundle =
        ConciergeService::bundle(&state.db, scope.tour_id.as_deref(), &state.config.gemini_model)
            .await?;
    if !admin.is_admin() {
        bundle.knowledge.clear();
        bundle.quick_actions.retain(|a| a.enabled);
    }
    Ok(Json(bundle))
}

pub async fn update_config(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<UpdateConciergeConfigRequest>,
) -> Result<Json<ConciergeConfig>, ApiError> {
    let config =
        ConciergeService::update_config(&state.db, body, &state.config.gemini_model).await?;
    Ok(Json(config))
}

pub async fn list_knowledge(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(scope): Query<ConfigScope>,
) -> Result<Json<Vec<ConciergeKnowledge>>, ApiError> {
    let config = ConciergeService::resolve_config(
        &state.db,
        scope.tour_id.as_deref(),
        &state.config.gemini_model,
    )
    .await?;
    Ok(Json(ConciergeService::list_knowledge(&state.db, &config.id).await?))
}

pub async fn create_knowledge(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<KnowledgeRequest>,
) -> Result<(StatusCode, Json<ConciergeKnowledge>), ApiError> {
    let item =
        ConciergeService::create_knowledge(&state.db, body, &state.config.gemini_model).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_knowledge(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<KnowledgeRequest>,
) -> Result<Json<ConciergeKnowledge>, ApiError> {
    Ok(Json(ConciergeService::update_knowledge(&state.db, &id, body).await?))
}

pub async fn delete_knowledge(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    ConciergeService::delete_knowledge(&state.db, &id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_quick_actions(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(scope): Query<ConfigScope>,
) -> Result<Json<Vec<ConciergeQuickAction>>, ApiError> {
    let config = ConciergeService::resolve_config(
        &state.db,
        scope.tour_id.as_deref(),
        &state.config.gemini_model,
    )
    .await?;
    Ok(Json(
        ConciergeService::list_quick_actions(&state.db, &config.id).await?,
    ))
}

pub async fn create_quick_action(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<QuickActionRequest>,
) -> Result<(StatusCode, Json<ConciergeQuickAction>), ApiError> {
    let action =
        ConciergeService::create_quick_action(&state.db, body, &state.config.gemini_model).await?;
    Ok((StatusCode::CREATED, Json(action)))
}

pub async fn update_quick_action(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<QuickActionRequest>,
) -> Result<Json<ConciergeQuickAction>, ApiError> {
    Ok(Json(
        ConciergeService::update_quick_action(&state.db, &id, body).await?,
    ))
}

pub async fn delete_quick_action(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    ConciergeService::delete_quick_action(&state.db, &id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn translate_quick_actions(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonBody(body): JsonBody<TranslateQuickActionsRequest>,
) -> Result<Json<Vec<ConciergeQuickAction>>, ApiError> {
    let actions = ConciergeService::translate_quick_actions(
        &state.db,
        &state.translator,
        body,
        &state.config.gemini_model,
    )
    .await?;
    Ok(Json(actions))
}

/// POST /concierge/chat: public visitor endpoint.
pub async fn chat(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let reply =
        ConciergeService::chat(&state.db, &state.gemini, body, &state.config.gemini_model).await?;
    Ok(Json(reply))
}
