use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
};
use serde::de::DeserializeOwned;

use crate::error::{api_error, ApiError};

/// JSON request body. Unlike `axum::Json`, a body that fails to parse or
/// deserialize is answered with 400 and the usual `{ "error": ... }` shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(reject(rejection)),
        }
    }
}

fn reject(rejection: JsonRejection) -> ApiError {
    let status = match &rejection {
        JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        // Body read failures keep their own status (413 on oversized bodies)
        JsonRejection::BytesRejection(_) => rejection.status(),
        _ => StatusCode::BAD_REQUEST,
    };
    tracing::debug!("rejected JSON body ({status}): {}", rejection.body_text());
    api_error(status, rejection.body_text())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{self, header},
    };
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "lowercase")]
    enum Gallery {
        North,
    }

    #[derive(Debug, Deserialize)]
    struct Placement {
        gallery: Gallery,
    }

    fn request(content_type: &str, body: &str) -> Request {
        http::Request::builder()
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn parses_valid_bodies() {
        let JsonBody(placement) =
            JsonBody::<Placement>::from_request(request("application/json", r#"{"gallery":"north"}"#), &())
                .await
                .unwrap();
        assert!(matches!(placement.gallery, Gallery::North));
    }

    #[tokio::test]
    async fn unknown_variants_are_bad_requests() {
        let (status, axum::Json(body)) = JsonBody::<Placement>::from_request(
            request("application/json", r#"{"gallery":"attic"}"#),
            &(),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("attic"));
    }

    #[tokio::test]
    async fn syntax_errors_and_missing_content_type() {
        let (status, _) =
            JsonBody::<Placement>::from_request(request("application/json", "{gallery"), &())
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, axum::Json(body)) =
            JsonBody::<Placement>::from_request(request("text/plain", r#"{"gallery":"north"}"#), &())
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body["error"].is_string());
    }
}
