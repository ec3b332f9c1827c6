//! Admin session routes. Mount under `/api/auth`.

use crate::handlers::auth::{current_user, login, logout, update_email, update_password};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/user", get(current_user))
        .route("/update-password", post(update_password))
        .route("/update-email", post(update_email))
        .with_state(state)
}
