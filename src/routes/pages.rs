use crate::handlers::pages::{home, service};
use crate::state::AppState;
use axum::{routing::get, Router};

/// Server-rendered page data: `/home` and `/services/:id`. Mount under `/pages`.
pub fn page_routes(state: AppState) -> Router {
    Router::new()
        .route("/home", get(home))
        .route("/services/:id", get(service))
        .with_state(state)
}
