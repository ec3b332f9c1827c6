//! Generic whitelisted-table routes.

use crate::handlers::table::{create, delete as delete_handler, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

/// `/:table` with GET (read), POST (create), PATCH (update), DELETE (delete). Mount under `/api`.
pub fn table_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/:table",
            get(read).post(create).patch(update).delete(delete_handler),
        )
        .with_state(state)
}
