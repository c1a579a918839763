use axum::http::StatusCode;
use prometheus::{Encoder, TextEncoder};

/// GET /metrics: Prometheus text exposition of the tourstack_* series.
pub async fn metrics_handler() -> Result<String, StatusCode> {
    // Touch the lazily registered series so a fresh process exports them at zero.
    lazy_static::initialize(&crate::services::metrics::TOURS_GAUGE);
    lazy_static::initialize(&crate::services::metrics::AI_REQUESTS_COUNTER);

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| {
            tracing::error!("metrics encoding failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
