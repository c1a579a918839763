//! Admin password login, session cookie and route protection.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, session_cookie, TestApp};
use serde_json::json;

const PASSWORD: &str = "correct horse battery staple";

#[tokio::test]
async fn open_mode_without_password() {
    let app = TestApp::new().await;

    let status = body_json(app.get("/api/auth/check").await).await;
    assert_eq!(status, json!({ "authenticated": true, "authRequired": false }));

    let response = app.post("/api/auth/login", json!({ "password": "" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());

    assert_eq!(app.get("/api/tours").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_need_a_session() {
    let app = TestApp::with_password(Some(PASSWORD)).await;

    let status = body_json(app.get("/api/auth/check").await).await;
    assert_eq!(status, json!({ "authenticated": false, "authRequired": true }));

    assert_eq!(app.get("/api/tours").await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.post("/api/tours", json!({ "title": { "en": "Nope" } }))
            .await
            .status(),
        StatusCode::UNAUTHORIZED
    );
    // Public surfaces stay open.
    assert_eq!(app.get("/api/settings").await.status(), StatusCode::OK);
    assert_eq!(app.get("/health").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_sets_cookie_and_logout_revokes_it() {
    let app = TestApp::with_password(Some(PASSWORD)).await;

    let wrong = app.post("/api/auth/login", json!({ "password": "guess" })).await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let response = app.post("/api/auth/login", json!({ "password": PASSWORD })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("session cookie");
    assert!(cookie.starts_with("tourstack.sid="));

    let status = body_json(
        app.request(Method::GET, "/api/auth/check", None, Some(&cookie))
            .await,
    )
    .await;
    assert_eq!(status["authenticated"], true);

    let created = app
        .request(
            Method::POST,
            "/api/tours",
            Some(json!({ "title": { "en": "Members Only" } })),
            Some(&cookie),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);

    let logout = app
        .request(Method::POST, "/api/auth/logout", None, Some(&cookie))
        .await;
    assert_eq!(logout.status(), StatusCode::OK);

    let after = app
        .request(Method::GET, "/api/tours", None, Some(&cookie))
        .await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn repeated_failures_are_rate_limited() {
    let app = TestApp::with_password(Some(PASSWORD)).await;

    for _ in 0..5 {
        let response = app.post("/api/auth/login", json!({ "password": "nope" })).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let blocked = app.post("/api/auth/login", json!({ "password": PASSWORD })).await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn visitor_preview_needs_admin() {
    let app = TestApp::with_password(Some(PASSWORD)).await;
    let login = app.post("/api/auth/login", json!({ "password": PASSWORD })).await;
    let cookie = session_cookie(&login).unwrap();

    app.request(
        Method::POST,
        "/api/tours",
        Some(json!({ "title": { "en": "Hidden Gems" } })),
        Some(&cookie),
    )
    .await;

    let anonymous = app.get("/api/visitor/tour/hidden-gems?preview=true").await;
    assert_eq!(anonymous.status(), StatusCode::NOT_FOUND);

    let admin = app
        .request(
            Method::GET,
            "/api/visitor/tour/hidden-gems?preview=true",
            None,
            Some(&cookie),
        )
        .await;
    assert_eq!(admin.status(), StatusCode::OK);
}
