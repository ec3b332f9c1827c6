pub mod auth;
pub mod common;
pub mod pages;
pub mod table;

pub use auth::auth_routes;
pub use common::common_routes;
pub use pages::page_routes;
pub use table::table_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// The full application: common routes, `/api/auth/*`, `/api/:table` and `/pages/*`.
pub fn app(state: AppState) -> Router {
    let body_limit = state.settings.body_limit_bytes;
    Router::new()
        .merge(common_routes(state.clone()))
        .nest("/api/auth", auth_routes(state.clone()))
        .nest("/api", table_routes(state.clone()))
        .nest("/pages", page_routes(state))
        .layer(RequestBodyLimitLayer::new(body_limit))
}
