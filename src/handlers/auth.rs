//! Session routes under /api/auth.

use crate::auth::{self, clear_session_cookie, session_cookie, AdminUser};
use crate::error::AppError;
use crate::extractors::SessionToken;
use crate::response::success;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    user: AdminUser,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordBody {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct UpdateEmailBody {
    #[serde(default)]
    pub email: String,
}

#[derive(Serialize)]
struct UpdateEmailResponse {
    success: bool,
    email: String,
}

/// Account SQL is never echoed to clients.
fn hide_sql(e: AppError) -> AppError {
    e.redact_sql(false)
}

fn parsed<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(b)| b)
        .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e.body_text())))
}

pub async fn login(State(state): State<AppState>, body: Result<Json<LoginBody>, JsonRejection>) -> Result<Response, AppError> {
    let body = parsed(body)?;
    let signed = auth::sign_in(state.db.as_ref(), &body.email, &body.password, state.settings.session_days)
        .await
        .map_err(hide_sql)?;
    let cookie = session_cookie(&signed.token, state.settings.session_days, state.settings.cookie_secure);
    Ok((
        [(SET_COOKIE, cookie.to_string())],
        Json(LoginResponse { user: signed.user }),
    )
        .into_response())
}

/// Always clears the cookie, even when the session was already gone.
pub async fn logout(State(state): State<AppState>, token: SessionToken) -> Result<Response, AppError> {
    if let Some(t) = token.as_deref() {
        auth::sign_out(state.db.as_ref(), t).await.map_err(hide_sql)?;
    }
    let cookie = clear_session_cookie(state.settings.cookie_secure);
    Ok(([(SET_COOKIE, cookie.to_string())], success()).into_response())
}

/// The admin behind the cookie, or `null`.
pub async fn current_user(State(state): State<AppState>, token: SessionToken) -> Result<Json<Value>, AppError> {
    let admin = auth::current_admin(state.db.as_ref(), token.as_deref()).await.map_err(hide_sql)?;
    let v = match admin {
        Some(a) => serde_json::to_value(a).map_err(|e| AppError::Internal(e.to_string()))?,
        None => Value::Null,
    };
    Ok(Json(v))
}

pub async fn update_password(
    State(state): State<AppState>,
    token: SessionToken,
    body: Result<Json<UpdatePasswordBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let admin = auth::require_admin(state.db.as_ref(), token.as_deref()).await.map_err(hide_sql)?;
    let body = parsed(body)?;
    auth::change_password(state.db.as_ref(), &admin.id, &body.current_password, &body.new_password)
        .await
        .map_err(hide_sql)?;
    tracing::info!(user_id = %admin.id, "password changed");
    Ok(success().into_response())
}

pub async fn update_email(
    State(state): State<AppState>,
    token: SessionToken,
    body: Result<Json<UpdateEmailBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let admin = auth::require_admin(state.db.as_ref(), token.as_deref()).await.map_err(hide_sql)?;
    let body = parsed(body)?;
    let email = auth::change_email(state.db.as_ref(), &admin.id, &body.email).await.map_err(hide_sql)?;
    tracing::info!(user_id = %admin.id, "email changed");
    Ok(Json(UpdateEmailResponse { success: true, email }).into_response())
}
