use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
};

use crate::{
    error::{api_error, ApiError},
    models::auth::{AdminSession, SESSION_COOKIE},
    services::auth::AuthService,
    AppState,
};

/// Extract a named cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|part| part.trim().strip_prefix(&prefix).map(str::to_string))
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value carrying the session token.
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}")
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

async fn current_session(parts: &Parts, state: &AppState) -> Result<String, ApiError> {
    let token = get_cookie(&parts.headers, SESSION_COOKIE)
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Authentication required"))?;
    let sid = AuthService::verify(&state.db, &state.config.session_secret, &token).await?;
    Ok(sid)
}

/// Admin-only routes take this extractor. With no admin password configured
/// every request is let through.
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !state.config.auth_required() {
            return Ok(AdminSession { session_id: None });
        }
        let session_id = current_session(parts, state).await?;
        Ok(AdminSession {
            session_id: Some(session_id),
        })
    }
}

/// Never rejects; tells public routes whether the caller is an admin.
#[derive(Debug, Clone)]
pub struct MaybeAdmin(pub Option<AdminSession>);

impl MaybeAdmin {
    pub fn is_admin(&self) -> bool {
        self.0.is_some()
    }
}

impl FromRequestParts<AppState> for MaybeAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !state.config.auth_required() {
            return Ok(MaybeAdmin(Some(AdminSession { session_id: None })));
        }
        match current_session(parts, state).await {
            Ok(session_id) => Ok(MaybeAdmin(Some(AdminSession {
                session_id: Some(session_id),
            }))),
            Err(_) => Ok(MaybeAdmin(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn reads_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; tourstack.sid=abc.def.ghi; other=1"),
        );
        assert_eq!(get_cookie(&headers, SESSION_COOKIE).as_deref(), Some("abc.def.ghi"));
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("tourstack.sid="));
        assert_eq!(get_cookie(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("tok", 604800);
        assert!(cookie.starts_with("tourstack.sid=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
