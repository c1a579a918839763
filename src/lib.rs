// Library exports for binary tools and tests
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use sqlx::SqlitePool;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{
    gemini::GeminiClient, settings::SettingsStore, translate::Translator, tts::SpeechClient,
    vision::VisionClient,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub settings: Arc<SettingsStore>,
    pub gemini: GeminiClient,
    pub vision: VisionClient,
    pub translator: Translator,
    pub speech: SpeechClient,
    /// Plain client for fetching remote images.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Arc<Config>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("tourstack-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            settings: Arc::new(SettingsStore::new(&config.settings_path)),
            gemini: GeminiClient::new(
                http.clone(),
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
            ),
            vision: VisionClient::new(http.clone(), config.google_vision_api_key.clone()),
            translator: Translator::new(
                http.clone(),
                config.libretranslate_url.clone(),
                config.libretranslate_api_key.clone(),
            ),
            speech: SpeechClient::new(
                http.clone(),
                config.deepgram_api_key.clone(),
                config.elevenlabs_api_key.clone(),
            ),
            http,
            db,
            config,
        })
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    // Localhost is always allowed for the admin and visitor dev servers.
    let allowed = config.cors_origins.clone();
    let public = config.public_base_url.clone();
    let origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let Ok(o) = origin.to_str() else {
            return false;
        };
        o.starts_with("http://localhost")
            || o.starts_with("http://127.0.0.1")
            || o == public
            || allowed.iter().any(|a| a == o || a == "*")
    });

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ]))
        .allow_credentials(true)
        .allow_origin(origin)
}

pub fn build_router(state: AppState) -> Router {
    use routes::*;

    let api = Router::new()
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/check", get(auth::check))
        // Tours
        .route("/tours", get(tours::list_tours).post(tours::create_tour))
        .route(
            "/tours/{id}",
            get(tours::get_tour).put(tours::update_tour).delete(tours::delete_tour),
        )
        .route("/tours/{id}/duplicate", post(tours::duplicate_tour))
        .route("/tours/{id}/publish", post(tours::publish_tour))
        .route("/tours/{id}/unpublish", post(tours::unpublish_tour))
        .route("/tours/{id}/translate", post(tours::translate_tour))
        .route("/tours/{id}/stops", get(stops::list_stops).post(stops::create_stop))
        .route("/tours/{id}/stops/reorder", put(stops::reorder_stops))
        // Stops
        .route(
            "/stops/{id}",
            get(stops::get_stop).put(stops::update_stop).delete(stops::delete_stop),
        )
        .route("/stops/{id}/qr", post(stops::regenerate_qr))
        .route("/stops/{id}/translate", post(stops::translate_stop))
        // Media
        .route("/media", get(media::list_media).post(media::upload_media))
        .route(
            "/media/{id}",
            get(media::get_media).put(media::update_media).delete(media::delete_media),
        )
        // Collections
        .route(
            "/collections",
            get(collections::list_collections).post(collections::create_collection),
        )
        .route(
            "/collections/{id}",
            get(collections::get_collection)
                .put(collections::update_collection)
                .delete(collections::delete_collection),
        )
        // Museums and templates
        .route("/museums", get(museums::list_museums).post(museums::create_museum))
        .route(
            "/museums/{id}",
            get(museums::get_museum)
                .put(museums::update_museum)
                .delete(museums::delete_museum),
        )
        .route(
            "/templates",
            get(museums::list_templates).post(museums::create_template),
        )
        .route(
            "/templates/{id}",
            get(museums::get_template).delete(museums::delete_template),
        )
        // Concierge
        .route(
            "/concierge/config",
            get(concierge::get_config).put(concierge::update_config),
        )
        .route(
            "/concierge/knowledge",
            get(concierge::list_knowledge).post(concierge::create_knowledge),
        )
        .route(
            "/concierge/knowledge/{id}",
            put(concierge::update_knowledge).delete(concierge::delete_knowledge),
        )
        .route(
            "/concierge/quick-actions",
            get(concierge::list_quick_actions).post(concierge::create_quick_action),
        )
        .route(
            "/concierge/quick-actions/translate",
            post(concierge::translate_quick_actions),
        )
        .route(
            "/concierge/quick-actions/{id}",
            put(concierge::update_quick_action).delete(concierge::delete_quick_action),
        )
        .route("/concierge/chat", post(concierge::chat))
        // Settings
        .route(
            "/settings",
            get(settings::get_settings)
                .put(settings::replace_settings)
                .patch(settings::patch_settings),
        )
        .route("/services/status", get(settings::services_status))
        // Visitor
        .route("/visitor/tour/{tour}", get(visitor::get_tour))
        .route("/visitor/tour/{tour}/stop/{stop}", get(visitor::get_stop))
        .route("/visitor/s/{code}", get(visitor::resolve_short_code))
        // AI, translation and speech
        .route("/gemini/analyze", post(ai::analyze_image))
        .route("/gemini/analyze-batch", post(ai::analyze_batch))
        .route("/gemini/analyze-document", post(ai::analyze_document))
        .route("/vision/analyze", post(ai::vision_analyze))
        .route("/translate", post(ai::translate_text))
        .route("/tts", post(ai::text_to_speech));

    let uploads = ServeDir::new(&state.config.uploads_dir);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api", api)
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        // Global body size limit of 100 MB (covers media uploads)
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
        .with_state(state)
}
