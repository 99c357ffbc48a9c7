use axum::{extract::State, Json};
use serde::Serialize;

use crate::engine::EngineStats;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub fingerprint: String,
    pub uptime_secs: u64,
    pub cache_enabled: bool,
    pub shared_backend: Option<&'static str>,
}

#[derive(Serialize)]
pub struct CacheCleared {
    pub cleared: bool,
    pub fingerprint: String,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let cache = state.engine.cache();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        fingerprint: state.engine.fingerprint(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        cache_enabled: cache.is_enabled(),
        shared_backend: cache.shared_backend(),
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<EngineStats> {
    Json(state.engine.stats())
}

pub async fn clear_cache(State(state): State<AppState>) -> Json<CacheCleared> {
    state.engine.clear_cache().await;
    tracing::info!("Resolution cache cleared via admin API");
    Json(CacheCleared {
        cleared: true,
        fingerprint: state.engine.fingerprint(),
    })
}
