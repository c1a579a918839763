use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{api_error, ApiError, ServiceError};

/// Fixed-window attempt counter stored in SQLite.
///
/// - Increments the counter for `key`
/// - Starts a new window when the current one is older than `window_secs`
/// - Returns 429 if the counter exceeds `max_attempts`
pub async fn check_rate_limit(
    pool: &SqlitePool,
    key: &str,
    max_attempts: i64,
    window_secs: i64,
) -> Result<(), ApiError> {
    let now = Utc::now().timestamp();
    let count: i64 = sqlx::query_scalar(
        "INSERT INTO login_attempts (key, count, window_start) VALUES (?1, 1, ?2)
         ON CONFLICT(key) DO UPDATE SET
            count = CASE WHEN window_start <= ?2 - ?3 THEN 1 ELSE count + 1 END,
            window_start = CASE WHEN window_start <= ?2 - ?3 THEN ?2 ELSE window_start END
         RETURNING count",
    )
    .bind(key)
    .bind(now)
    .bind(window_secs)
    .fetch_one(pool)
    .await
    .map_err(ServiceError::from)?;

    if count > max_attempts {
        tracing::warn!(key, count, "rate limit exceeded");
        return Err(api_error(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many attempts. Try again in a few minutes.",
        ));
    }
    Ok(())
}

/// Forget the attempts for `key` (after a successful login).
pub async fn reset_rate_limit(pool: &SqlitePool, key: &str) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM login_attempts WHERE key = ?1")
        .bind(key)
        .execute(pool)
        .await
        .map_err(ServiceError::from)?;
    Ok(())
}

/// Best-effort client address: first `X-Forwarded-For` hop, then `X-Real-IP`,
/// then the socket peer, else `unknown`.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let ip = header("x-forwarded-for")
            .or_else(|| header("x-real-ip"))
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".into());
        Ok(ClientIp(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn blocks_after_max_attempts() {
        let pool = db::create_memory_pool().await.unwrap();
        for _ in 0..5 {
            check_rate_limit(&pool, "login:1.2.3.4", 5, 900).await.unwrap();
        }
        let (status, _) = check_rate_limit(&pool, "login:1.2.3.4", 5, 900)
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        // Other keys are independent.
        check_rate_limit(&pool, "login:5.6.7.8", 5, 900).await.unwrap();

        reset_rate_limit(&pool, "login:1.2.3.4").await.unwrap();
        check_rate_limit(&pool, "login:1.2.3.4", 5, 900).await.unwrap();
    }

    #[tokio::test]
    async fn expired_window_starts_over() {
        let pool = db::create_memory_pool().await.unwrap();
        sqlx::query("INSERT INTO login_attempts (key, count, window_start) VALUES ('k', 99, ?1)")
            .bind(Utc::now().timestamp() - 1000)
            .execute(&pool)
            .await
            .unwrap();
        check_rate_limit(&pool, "k", 5, 900).await.unwrap();
    }
}
