use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    error::ApiError,
    middleware::{
        auth::{clear_session_cookie, get_cookie, session_cookie, MaybeAdmin},
        json::JsonBody,
        rate_limit::{check_rate_limit, reset_rate_limit, ClientIp},
    },
    models::auth::{AuthStatus, LoginRequest, SESSION_COOKIE},
    services::auth::AuthService,
    AppState,
};

pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    if !state.config.auth_required() {
        return Ok(Json(json!({ "success": true, "authRequired": false })).into_response());
    }

    // Rate limit: 5 attempts per 15 min per client address
    let rate_key = format!("login:{ip}");
    check_rate_limit(&state.db, &rate_key, 5, 900).await?;

    let session = AuthService::login(&state.db, &state.config, &body.password).await?;
    reset_rate_limit(&state.db, &rate_key).await?;

    Ok((
        [(header::SET_COOKIE, session_cookie(&session.token, session.max_age_secs))],
        Json(json!({ "success": true, "authRequired": true })),
    )
        .into_response())
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(token) = get_cookie(&headers, SESSION_COOKIE) {
        AuthService::logout(&state.db, &state.config.session_secret, &token).await?;
    }
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "success": true })),
    )
        .into_response())
}

pub async fn check(State(state): State<AppState>, admin: MaybeAdmin) -> Json<AuthStatus> {
    Json(AuthStatus {
        authenticated: admin.is_admin(),
        auth_required: state.config.auth_required(),
    })
}
