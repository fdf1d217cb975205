// Health and readiness probes

use axum::Json;
use chrono::Utc;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::time::Instant;

static START: Lazy<Instant> = Lazy::new(Instant::now);

/// Pin the process start time; called once from main so uptime is
/// measured from startup rather than the first probe.
pub fn record_start_time() {
    Lazy::force(&START);
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_secs": START.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /ready
pub async fn ready() -> Json<Value> {
    Json(json!({ "ready": true }))
}
