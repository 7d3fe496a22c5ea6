//! HTTP API surface.
//!
//! Thin I/O wrapper over `utter_core::SynthesisService`: route handlers
//! parse requests, delegate, and map errors to status codes. No synthesis
//! logic lives here.

mod audio;
mod synthesize;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/synthesize", post(synthesize::synthesize))
        .route("/audio/:artifact_id", get(audio::download))
        .route("/voices", get(synthesize::voices))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness plus a small stats snapshot.
async fn healthz(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let stats = state.service.stats();
    Json(json!({
        "status": if stats.usable_slots > 0 { "ok" } else { "degraded" },
        "engine_slots_usable": stats.usable_slots,
        "engine_slots_idle": stats.idle_slots,
        "jobs_queued": stats.queued_jobs,
        "jobs_running": stats.running_jobs,
        "artifacts": stats.artifact_count,
        "artifact_bytes": stats.artifact_bytes,
    }))
}
