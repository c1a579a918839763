use serde::{Deserialize, Serialize};

/// Name of the admin session cookie.
pub const SESSION_COOKIE: &str = "tourstack.sid";

/// Claims embedded in the session token carried by the cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sid: String, // session row id (enables logout revocation)
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from a valid admin session, available via Axum extractors
#[derive(Debug, Clone)]
pub struct AdminSession {
    /// `None` when auth is disabled (no ADMIN_PASSWORD configured).
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub authenticated: bool,
    pub auth_required: bool,
}
