//! Page data routes.

use crate::client::LocalClient;
use crate::error::AppError;
use crate::extractors::SessionToken;
use crate::pages::{load_home, load_service, HomePage};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

pub async fn home(State(state): State<AppState>, token: SessionToken) -> Result<Json<HomePage>, AppError> {
    let client = LocalClient::for_session(&state, token.as_deref())
        .await
        .map_err(|e| e.redact_sql(false))?;
    Ok(Json(load_home(&client).await))
}

pub async fn service(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, AppError> {
    if id.parse::<i64>().is_err() {
        return Err(AppError::NotFound("Service not found".into()));
    }
    let client = LocalClient::new(&state);
    match load_service(&client, &id).await {
        Ok(Some(row)) => Ok(Json(row)),
        Ok(None) => Err(AppError::NotFound("Service not found".into())),
        Err(e) => Err(AppError::Internal(e.message)),
    }
}
