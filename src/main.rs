use std::{net::SocketAddr, sync::Arc};

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tourstack_api::{build_router, config::Config, db, services::metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_path).await?;
    db::run_migrations(&pool).await?;
    info!("Database {} opened and migrations applied", config.database_path);

    tokio::fs::create_dir_all(&config.uploads_dir).await?;

    if config.auth_required() {
        info!("Admin authentication enabled");
    } else {
        info!("ADMIN_PASSWORD not set, admin authentication disabled");
    }
    for (name, configured) in [
        ("Gemini", config.gemini_api_key.is_some()),
        ("Google Vision", config.google_vision_api_key.is_some()),
        ("Deepgram", config.deepgram_api_key.is_some()),
        ("ElevenLabs", config.elevenlabs_api_key.is_some()),
    ] {
        if !configured {
            info!("{name} not configured, related endpoints return 503");
        }
    }

    metrics::start(pool.clone());

    let state = AppState::new(pool, config.clone())?;
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("TourStack API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
