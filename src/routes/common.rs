//! Liveness, readiness and build info.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::time::Instant;

#[derive(Serialize)]
struct Probe {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ping_ms: Option<u128>,
}

#[derive(Serialize)]
struct BuildInfo {
    name: &'static str,
    version: &'static str,
    tables: Vec<String>,
}

async fn live() -> Json<Probe> {
    Json(Probe {
        status: "ok",
        database: None,
        ping_ms: None,
    })
}

/// 503 while the database does not answer `SELECT 1`.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Probe>) {
    let started = Instant::now();
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(Probe {
                status: "ok",
                database: Some("ok"),
                ping_ms: Some(started.elapsed().as_millis()),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e.message, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Probe {
                    status: "degraded",
                    database: Some("unavailable"),
                    ping_ms: None,
                }),
            )
        }
    }
}

async fn build_info(State(state): State<AppState>) -> Json<BuildInfo> {
    let mut tables: Vec<String> = state.tables.names().map(str::to_string).collect();
    tables.sort();
    Json(BuildInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        tables,
    })
}

/// GET /health, GET /ready, GET /version (lists the whitelisted tables).
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(live))
        .route("/ready", get(ready))
        .route("/version", get(build_info))
        .with_state(state)
}
