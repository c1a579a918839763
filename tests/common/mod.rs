#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use tourstack_api::{build_router, config::Config, db, AppState};

/// A router over a fresh in-memory database and a scratch directory.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_password(None).await
    }

    pub async fn with_password(password: Option<&str>) -> Self {
        let password = password.map(str::to_string);
        Self::with_config(|config| config.admin_password = password).await
    }

    /// Default test config, adjusted by `configure` before the router is built.
    pub async fn with_config(configure: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join("settings.json");
        let uploads = dir.path().join("uploads");
        let mut config = Config::for_paths(
            ":memory:",
            settings.to_str().unwrap(),
            uploads.to_str().unwrap(),
        );
        configure(&mut config);

        let pool = db::create_memory_pool().await.unwrap();
        let state = AppState::new(pool.clone(), Arc::new(config)).unwrap();
        Self {
            router: build_router(state),
            pool,
            dir,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response<Body> {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> Response<Body> {
        self.request(Method::PUT, uri, Some(body), None).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> Response<Body> {
        self.request(Method::PATCH, uri, Some(body), None).await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.request(Method::DELETE, uri, None, None).await
    }

    /// POST and return the JSON body, asserting the expected status.
    pub async fn post_ok(&self, uri: &str, body: Value, expected: StatusCode) -> Value {
        let response = self.post(uri, body).await;
        assert_eq!(response.status(), expected, "POST {uri}");
        body_json(response).await
    }

    pub async fn create_tour(&self, title: &str) -> Value {
        self.post_ok(
            "/api/tours",
            json!({ "title": { "en": title } }),
            StatusCode::CREATED,
        )
        .await
    }

    pub async fn create_stop(&self, tour_id: &str, title: &str) -> Value {
        self.post_ok(
            &format!("/api/tours/{tour_id}/stops"),
            json!({ "title": { "en": title } }),
            StatusCode::CREATED,
        )
        .await
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `name=value` part of the first Set-Cookie header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_string)
}
