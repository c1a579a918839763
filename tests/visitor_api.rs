//! Visitor resolution by slug, id and short code.

mod common;

use axum::http::StatusCode;
use common::{body_json, TestApp};
use serde_json::{json, Value};

async fn published_tour(app: &TestApp) -> (Value, Vec<Value>) {
    let tour = app.create_tour("Roman Gallery").await;
    let id = tour["id"].as_str().unwrap().to_string();
    let stops = vec![
        app.create_stop(&id, "Bust of Hadrian").await,
        app.create_stop(&id, "Mosaic Floor").await,
        app.create_stop(&id, "Oil Lamp").await,
    ];
    app.post_ok(&format!("/api/tours/{id}/publish"), json!({}), StatusCode::OK)
        .await;
    (tour, stops)
}

#[tokio::test]
async fn slug_and_id_lookups_return_the_same_tour() {
    let app = TestApp::new().await;
    let (tour, _) = published_tour(&app).await;
    let id = tour["id"].as_str().unwrap();

    let by_slug = app.get("/api/visitor/tour/roman-gallery").await;
    assert_eq!(by_slug.status(), StatusCode::OK);
    let by_slug = body_json(by_slug).await;
    let by_id = body_json(app.get(&format!("/api/visitor/tour/{id}")).await).await;

    assert_eq!(by_slug, by_id);
    assert_eq!(by_slug["stops"].as_array().unwrap().len(), 3);
    assert_eq!(by_slug["stops"][0]["slug"], "bust-of-hadrian");
}

#[tokio::test]
async fn stop_lookup_carries_neighbours() {
    let app = TestApp::new().await;
    let (tour, stops) = published_tour(&app).await;

    let middle = body_json(
        app.get("/api/visitor/tour/roman-gallery/stop/mosaic-floor")
            .await,
    )
    .await;
    assert_eq!(middle["index"], 1);
    assert_eq!(middle["total"], 3);
    assert_eq!(middle["previous"]["slug"], "bust-of-hadrian");
    assert_eq!(middle["next"]["slug"], "oil-lamp");

    let by_ids = body_json(
        app.get(&format!(
            "/api/visitor/tour/{}/stop/{}",
            tour["id"].as_str().unwrap(),
            stops[1]["id"].as_str().unwrap()
        ))
        .await,
    )
    .await;
    assert_eq!(by_ids, middle);

    let first = body_json(
        app.get("/api/visitor/tour/roman-gallery/stop/bust-of-hadrian")
            .await,
    )
    .await;
    assert!(first["previous"].is_null());
}

#[tokio::test]
async fn drafts_are_hidden_from_visitors() {
    let app = TestApp::new().await;
    let tour = app.create_tour("Unfinished Wing").await;
    let stop = app
        .create_stop(tour["id"].as_str().unwrap(), "Scaffolding")
        .await;

    assert_eq!(
        app.get("/api/visitor/tour/unfinished-wing").await.status(),
        StatusCode::NOT_FOUND
    );
    let code = stop["shortCode"].as_str().unwrap();
    assert_eq!(
        app.get(&format!("/api/visitor/s/{code}")).await.status(),
        StatusCode::NOT_FOUND
    );

    // Auth is off in this app, so the caller counts as an admin.
    let preview = app
        .get("/api/visitor/tour/unfinished-wing?preview=true")
        .await;
    assert_eq!(preview.status(), StatusCode::OK);
}

#[tokio::test]
async fn short_code_resolves_to_visitor_url() {
    let app = TestApp::new().await;
    let (tour, stops) = published_tour(&app).await;
    let code = stops[2]["shortCode"].as_str().unwrap();

    let response = app.get(&format!("/api/visitor/s/{code}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let target = body_json(response).await;
    assert_eq!(target["tourId"], tour["id"]);
    assert_eq!(target["stopSlug"], "oil-lamp");
    assert_eq!(
        target["url"],
        "http://localhost:5173/visitor/tour/roman-gallery/stop/oil-lamp"
    );

    assert_eq!(
        app.get("/api/visitor/s/zzzzzzzz").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn regenerated_qr_retires_old_code() {
    let app = TestApp::new().await;
    let (_, stops) = published_tour(&app).await;
    let stop_id = stops[0]["id"].as_str().unwrap();
    let old_code = stops[0]["shortCode"].as_str().unwrap().to_string();

    let qr = app
        .post_ok(&format!("/api/stops/{stop_id}/qr"), json!({}), StatusCode::OK)
        .await;
    let new_code = qr["shortCode"].as_str().unwrap();
    assert_ne!(new_code, old_code);

    assert_eq!(
        app.get(&format!("/api/visitor/s/{old_code}")).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get(&format!("/api/visitor/s/{new_code}")).await.status(),
        StatusCode::OK
    );
}
