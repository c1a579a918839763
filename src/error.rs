use axum::{http::StatusCode, Json};
use serde_json::{json, Value};
use thiserror::Error;

/// Error shape returned by every handler: a status plus `{ "error": "..." }`.
pub type ApiError = (StatusCode, Json<Value>);

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    /// A third-party API (Gemini, Vision, translation, TTS) failed or returned garbage.
    #[error("{service}: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ServiceError::Invalid(msg.into())
    }

    pub fn upstream(service: &'static str, msg: impl std::fmt::Display) -> Self {
        ServiceError::Upstream {
            service,
            message: msg.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Invalid(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ServiceError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            ServiceError::Database(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                StatusCode::CONFLICT
            }
            ServiceError::Database(_) | ServiceError::Io(_) | ServiceError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let status = e.status();
        if status.is_server_error() {
            tracing::error!("{e}");
        } else {
            tracing::debug!("request rejected ({status}): {e}");
        }
        (status, Json(json!({ "error": e.to_string() })))
    }
}

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(ServiceError::NotFound("Tour").status(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::invalid("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::upstream("gemini", "timeout").status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServiceError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn converts_to_error_body() {
        let (status, Json(body)): ApiError = ServiceError::NotFound("Stop").into();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Stop not found");
    }
}
