//! Generic table endpoint: GET/POST/PATCH/DELETE /api/:table.

use crate::auth;
use crate::config::TableSpec;
use crate::error::AppError;
use crate::extractors::SessionToken;
use crate::query::{Predicate, SelectQuery};
use crate::response::success;
use crate::service::{Operation, TableService};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

type Pairs = Vec<(String, String)>;

/// Resolve the caller only when the operation needs one; a missing cookie costs no query.
async fn authorize(state: &AppState, table: &TableSpec, op: Operation, token: Option<&str>) -> Result<(), AppError> {
    TableService::check_writable(table, op)?;
    if !TableService::requires_admin(table, op) {
        return Ok(());
    }
    let token = token.ok_or(AppError::Unauthorized)?;
    let session = auth::find_session(state.db.as_ref(), token)
        .await?
        .ok_or(AppError::Unauthorized)?;
    TableService::authorize(state.db.as_ref(), table, op, Some(&session)).await
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v)
        .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e.body_text())))
}

pub async fn read(
    State(state): State<AppState>,
    Path(table): Path<String>,
    token: SessionToken,
    Query(pairs): Query<Pairs>,
) -> Result<Response, AppError> {
    read_rows(&state, &table, token.as_deref(), &pairs)
        .await
        .map_err(|e| e.redact_sql(state.settings.expose_sql_errors))
}

async fn read_rows(state: &AppState, table: &str, token: Option<&str>, pairs: &[(String, String)]) -> Result<Response, AppError> {
    let spec = state.tables.resolve(table)?;
    let query = SelectQuery::from_query_pairs(spec.name(), pairs)?;
    authorize(state, spec, Operation::Read, token).await?;
    let rows = TableService::list(state.db.as_ref(), spec, &query).await?;
    if query.single {
        let first = rows.into_iter().next().unwrap_or(Value::Null);
        return Ok(Json(first).into_response());
    }
    Ok(Json(Value::Array(rows)).into_response())
}

pub async fn create(
    State(state): State<AppState>,
    Path(table): Path<String>,
    token: SessionToken,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    create_row(&state, &table, token.as_deref(), body)
        .await
        .map_err(|e| e.redact_sql(state.settings.expose_sql_errors))
}

async fn create_row(
    state: &AppState,
    table: &str,
    token: Option<&str>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let spec = state.tables.resolve(table)?;
    authorize(state, spec, Operation::Create, token).await?;
    let body = json_body(body)?;
    let created = TableService::create(state.db.as_ref(), spec, &body).await?;
    Ok(Json(created).into_response())
}

pub async fn update(
    State(state): State<AppState>,
    Path(table): Path<String>,
    token: SessionToken,
    Query(pairs): Query<Pairs>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    update_rows(&state, &table, token.as_deref(), &pairs, body)
        .await
        .map_err(|e| e.redact_sql(state.settings.expose_sql_errors))
}

async fn update_rows(
    state: &AppState,
    table: &str,
    token: Option<&str>,
    pairs: &[(String, String)],
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let spec = state.tables.resolve(table)?;
    authorize(state, spec, Operation::Update, token).await?;
    let predicate = Predicate::first_of(pairs)?;
    let patch = json_body(body)?;
    TableService::update(state.db.as_ref(), spec, &predicate, &patch).await?;
    Ok(success().into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    Path(table): Path<String>,
    token: SessionToken,
    Query(pairs): Query<Pairs>,
) -> Result<Response, AppError> {
    delete_rows(&state, &table, token.as_deref(), &pairs)
        .await
        .map_err(|e| e.redact_sql(state.settings.expose_sql_errors))
}

async fn delete_rows(state: &AppState, table: &str, token: Option<&str>, pairs: &[(String, String)]) -> Result<Response, AppError> {
    let spec = state.tables.resolve(table)?;
    authorize(state, spec, Operation::Delete, token).await?;
    let predicate = Predicate::first_of(pairs)?;
    TableService::delete(state.db.as_ref(), spec, &predicate).await?;
    Ok(success().into_response())
}
