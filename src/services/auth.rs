use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    config::Config,
    error::{ServiceError, ServiceResult},
    models::auth::SessionClaims,
    services::metrics,
};

/// A freshly issued admin session.
pub struct IssuedSession {
    pub session_id: String,
    pub token: String,
    pub max_age_secs: i64,
}

pub struct AuthService;

impl AuthService {
    /// Check the admin password and open a session.
    pub async fn login(pool: &SqlitePool, config: &Config, password: &str) -> ServiceResult<IssuedSession> {
        let expected = config
            .admin_password
            .as_deref()
            .ok_or_else(|| ServiceError::invalid("Authentication is disabled"))?;

        if !passwords_match(password, expected) {
            metrics::LOGINS_COUNTER.with_label_values(&["failure"]).inc();
            tracing::warn!("admin login failed");
            return Err(ServiceError::Unauthorized("Invalid password"));
        }

        // Expired and revoked rows are useless past this point.
        sqlx::query("DELETE FROM sessions WHERE revoked = 1 OR expires_at < ?1")
            .bind(Utc::now())
            .execute(pool)
            .await?;

        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + Duration::days(config.session_days);
        sqlx::query("INSERT INTO sessions (id, created_at, expires_at, revoked) VALUES (?1, ?2, ?3, 0)")
            .bind(&session_id)
            .bind(now)
            .bind(expires_at)
            .execute(pool)
            .await?;

        let token = Self::issue_token(&session_id, &config.session_secret, now, expires_at)?;
        metrics::LOGINS_COUNTER.with_label_values(&["success"]).inc();
        tracing::info!(session_id = %session_id, "admin logged in");

        Ok(IssuedSession {
            session_id,
            token,
            max_age_secs: (expires_at - now).num_seconds(),
        })
    }

    fn issue_token(
        session_id: &str,
        secret: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> ServiceResult<String> {
        let claims = SessionClaims {
            sid: session_id.to_string(),
            iat: issued_at.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(anyhow::Error::from)?;
        Ok(token)
    }

    /// Session id carried by a valid, unexpired and unrevoked token.
    pub async fn verify(pool: &SqlitePool, secret: &str, token: &str) -> ServiceResult<String> {
        let claims = decode_token(token, secret)
            .ok_or(ServiceError::Unauthorized("Invalid or expired session"))?;

        let row: Option<(bool, DateTime<Utc>)> =
            sqlx::query_as("SELECT revoked, expires_at FROM sessions WHERE id = ?1")
                .bind(&claims.sid)
                .fetch_optional(pool)
                .await?;
        match row {
            Some((false, expires_at)) if expires_at > Utc::now() => Ok(claims.sid),
            _ => Err(ServiceError::Unauthorized("Invalid or expired session")),
        }
    }

    /// Revoke the session behind `token`. Unknown or malformed tokens are ignored.
    pub async fn logout(pool: &SqlitePool, secret: &str, token: &str) -> ServiceResult<()> {
        if let Some(claims) = decode_token(token, secret) {
            sqlx::query("UPDATE sessions SET revoked = 1 WHERE id = ?1")
                .bind(&claims.sid)
                .execute(pool)
                .await?;
            tracing::info!(session_id = %claims.sid, "admin logged out");
        }
        Ok(())
    }
}

fn decode_token(token: &str, secret: &str) -> Option<SessionClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<SessionClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .ok()
}

/// Compares SHA-256 digests so timing does not depend on where the inputs differ.
fn passwords_match(given: &str, expected: &str) -> bool {
    let a = Sha256::digest(given.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn config() -> Config {
        Config {
            admin_password: Some("s3cret".into()),
            ..Config::for_paths(":memory:", "settings.json", "uploads")
        }
    }

    #[test]
    fn password_comparison() {
        assert!(passwords_match("s3cret", "s3cret"));
        assert!(!passwords_match("s3cre", "s3cret"));
        assert!(!passwords_match("", "s3cret"));
    }

    #[tokio::test]
    async fn login_verify_logout() {
        let pool = db::create_memory_pool().await.unwrap();
        let config = config();

        let session = AuthService::login(&pool, &config, "s3cret").await.unwrap();
        assert_eq!(session.max_age_secs, 7 * 24 * 3600);
        let sid = AuthService::verify(&pool, &config.session_secret, &session.token)
            .await
            .unwrap();
        assert_eq!(sid, session.session_id);

        AuthService::logout(&pool, &config.session_secret, &session.token)
            .await
            .unwrap();
        assert!(AuthService::verify(&pool, &config.session_secret, &session.token)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn wrong_password_and_foreign_tokens_are_rejected() {
        let pool = db::create_memory_pool().await.unwrap();
        let config = config();

        let err = AuthService::login(&pool, &config, "nope").await.err().unwrap();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let session = AuthService::login(&pool, &config, "s3cret").await.unwrap();
        assert!(AuthService::verify(&pool, "another-secret", &session.token)
            .await
            .is_err());
        assert!(AuthService::verify(&pool, &config.session_secret, "garbage")
            .await
            .is_err());
    }
}
