use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge, register_gauge_vec, CounterVec, Gauge, GaugeVec};
use sqlx::SqlitePool;
use tracing::{info, warn};

lazy_static! {
    // ── Event counters ──────────────────────────────────────────────────────
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "tourstack_logins_total",
        "Admin login attempts by outcome",
        &["status"]
    ).unwrap();

    pub static ref MEDIA_UPLOADS_COUNTER: CounterVec = register_counter_vec!(
        "tourstack_media_uploads_total",
        "Media files stored by kind",
        &["kind"]
    ).unwrap();

    pub static ref AI_REQUESTS_COUNTER: CounterVec = register_counter_vec!(
        "tourstack_ai_requests_total",
        "Calls to third-party AI, translation and speech services",
        &["service", "status"]
    ).unwrap();

    pub static ref VISITOR_LOOKUPS_COUNTER: CounterVec = register_counter_vec!(
        "tourstack_visitor_lookups_total",
        "Visitor resolutions by kind (tour, stop, short_code) and outcome",
        &["kind", "status"]
    ).unwrap();

    // ── Content gauges ──────────────────────────────────────────────────────
    pub static ref TOURS_GAUGE: GaugeVec = register_gauge_vec!(
        "tourstack_tours",
        "Tours by status",
        &["status"]
    ).unwrap();

    pub static ref STOPS_GAUGE: Gauge = register_gauge!(
        "tourstack_stops",
        "Stops across all tours"
    ).unwrap();

    pub static ref MEDIA_GAUGE: GaugeVec = register_gauge_vec!(
        "tourstack_media_files",
        "Media library files by kind",
        &["kind"]
    ).unwrap();
}

/// Record the outcome of a third-party call.
pub fn record_ai(service: &str, ok: bool) {
    AI_REQUESTS_COUNTER
        .with_label_values(&[service, if ok { "ok" } else { "error" }])
        .inc();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: SqlitePool) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
        }
    });
}

async fn collect(pool: &SqlitePool) -> anyhow::Result<()> {
    let tours: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM tours GROUP BY status")
            .fetch_all(pool)
            .await?;
    TOURS_GAUGE.reset();
    for (status, count) in &tours {
        TOURS_GAUGE.with_label_values(&[status.as_str()]).set(*count as f64);
    }

    let stops: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stops")
        .fetch_one(pool)
        .await?;
    STOPS_GAUGE.set(stops as f64);

    let media: Vec<(String, i64)> = sqlx::query_as("SELECT kind, COUNT(*) FROM media GROUP BY kind")
        .fetch_all(pool)
        .await?;
    MEDIA_GAUGE.reset();
    for (kind, count) in &media {
        MEDIA_GAUGE.with_label_values(&[kind.as_str()]).set(*count as f64);
    }

    info!("Metrics: collected ({} tour statuses, {} stops)", tours.len(), stops);
    Ok(())
}
