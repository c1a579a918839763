//! Tour, stop and quick-action translation against a local LibreTranslate stand-in.

mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use common::{body_json, TestApp};
use serde_json::{json, Value};

/// Serves `/translate`, answering `[target] text`. Any text containing
/// "untranslatable" gets a 500. Returns the base URL and a call counter.
async fn spawn_translator() -> (String, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/translate",
            post(
                |State(calls): State<Arc<AtomicUsize>>, Json(body): Json<Value>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let q = body["q"].as_str().unwrap_or_default();
                    let target = body["target"].as_str().unwrap_or_default();
                    if q.contains("untranslatable") {
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "error": "engine crashed" })),
                        );
                    }
                    (
                        StatusCode::OK,
                        Json(json!({ "translatedText": format!("[{target}] {q}") })),
                    )
                },
            ),
        )
        .with_state(calls.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), calls)
}

async fn app_with_translator() -> (TestApp, Arc<AtomicUsize>) {
    let (url, calls) = spawn_translator().await;
    let app = TestApp::with_config(|config| config.libretranslate_url = url).await;
    (app, calls)
}

#[tokio::test]
async fn tour_translation_persists_stops_and_languages() {
    let (app, _calls) = app_with_translator().await;
    let tour = app.create_tour("Sculpture Hall").await;
    let tour_id = tour["id"].as_str().unwrap().to_string();
    let stop = app.create_stop(&tour_id, "Bronze Horse").await;
    let stop_id = stop["id"].as_str().unwrap().to_string();
    let edited = app
        .put(
            &format!("/api/stops/{stop_id}"),
            json!({ "content": [
                { "id": "b1", "type": "text", "data": { "content": { "en": "Cast in 1890" } } }
            ] }),
        )
        .await;
    assert_eq!(edited.status(), StatusCode::OK);
    let version_before = body_json(app.get(&format!("/api/tours/{tour_id}")).await).await["version"]
        .as_i64()
        .unwrap();

    let report = app
        .post_ok(
            &format!("/api/tours/{tour_id}/translate"),
            json!({ "targetLanguages": ["fr"] }),
            StatusCode::OK,
        )
        .await;
    assert_eq!(report["translated"], 3);
    assert_eq!(report["languages"], json!(["fr"]));
    assert_eq!(report["tour"]["languages"], json!(["en", "fr"]));
    assert_eq!(report["tour"]["version"], version_before + 1);

    let fetched = body_json(app.get(&format!("/api/tours/{tour_id}")).await).await;
    assert_eq!(fetched["title"]["fr"], "[fr] Sculpture Hall");

    let stored = body_json(app.get(&format!("/api/stops/{stop_id}")).await).await;
    assert_eq!(stored["title"]["fr"], "[fr] Bronze Horse");
    assert_eq!(stored["content"][0]["data"]["content"]["fr"], "[fr] Cast in 1890");
    assert_eq!(stored["content"][0]["data"]["content"]["en"], "Cast in 1890");
}

#[tokio::test]
async fn first_upstream_failure_stops_the_pass() {
    let (app, calls) = app_with_translator().await;
    let tour_id = app.create_tour("Reserve Collection").await["id"]
        .as_str()
        .unwrap()
        .to_string();
    let broken = app.create_stop(&tour_id, "untranslatable relic").await;
    let later = app.create_stop(&tour_id, "Clay Pot").await;
    let version_before = body_json(app.get(&format!("/api/tours/{tour_id}")).await).await["version"]
        .clone();

    let response = app
        .post(
            &format!("/api/tours/{tour_id}/translate"),
            json!({ "targetLanguages": ["fr"] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("engine crashed"));

    // Tour title, then the failing stop title; the later stop is never sent.
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let tour = body_json(app.get(&format!("/api/tours/{tour_id}")).await).await;
    assert_eq!(tour["version"], version_before);
    assert_eq!(tour["languages"], json!(["en"]));
    assert!(tour["title"].get("fr").is_none());
    for stop in [broken, later] {
        let stored = body_json(
            app.get(&format!("/api/stops/{}", stop["id"].as_str().unwrap()))
                .await,
        )
        .await;
        assert!(stored["title"].get("fr").is_none());
    }
}

#[tokio::test]
async fn single_stop_uses_tour_languages_and_keeps_existing_text() {
    let (app, calls) = app_with_translator().await;
    let tour = app
        .post_ok(
            "/api/tours",
            json!({ "title": { "en": "Print Room" }, "languages": ["en", "de", "fr"] }),
            StatusCode::CREATED,
        )
        .await;
    let tour_id = tour["id"].as_str().unwrap();
    let stop = app
        .post_ok(
            &format!("/api/tours/{tour_id}/stops"),
            json!({ "title": { "en": "Woodcut", "de": "Holzschnitt" } }),
            StatusCode::CREATED,
        )
        .await;
    let stop_id = stop["id"].as_str().unwrap();

    let translated = app
        .post_ok(&format!("/api/stops/{stop_id}/translate"), json!({}), StatusCode::OK)
        .await;
    assert_eq!(translated["title"]["de"], "Holzschnitt");
    assert_eq!(translated["title"]["fr"], "[fr] Woodcut");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stored = body_json(app.get(&format!("/api/stops/{stop_id}")).await).await;
    assert_eq!(stored["title"]["fr"], "[fr] Woodcut");

    let overwritten = app
        .post_ok(
            &format!("/api/stops/{stop_id}/translate"),
            json!({ "targetLanguages": ["de"], "overwrite": true }),
            StatusCode::OK,
        )
        .await;
    assert_eq!(overwritten["title"]["de"], "[de] Woodcut");
}

#[tokio::test]
async fn quick_action_questions_are_translated_and_stored() {
    let (app, _calls) = app_with_translator().await;
    app.post_ok(
        "/api/concierge/quick-actions",
        json!({ "question": { "en": "Where is the café?" }, "category": "amenities" }),
        StatusCode::CREATED,
    )
    .await;

    let actions = app
        .post_ok(
            "/api/concierge/quick-actions/translate",
            json!({ "sourceLanguage": "en", "targetLanguages": ["de"] }),
            StatusCode::OK,
        )
        .await;
    assert_eq!(actions[0]["question"]["de"], "[de] Where is the café?");

    let bundle = body_json(app.get("/api/concierge/config").await).await;
    assert_eq!(
        bundle["quickActions"][0]["question"]["de"],
        "[de] Where is the café?"
    );
}
