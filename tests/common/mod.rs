#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use cms_core::db::ScriptedExecutor;
use cms_core::error::DbError;
use cms_core::sql::QueryBuf;
use cms_core::{app, AppState, Settings, TableRegistry};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_ID: &str = "6f0c9a52-5b1e-4d7a-9d0e-2f7d1c3b4a11";
pub const ADMIN_EMAIL: &str = "admin@site.io";
pub const ADMIN_TOKEN: &str = "admin-token";
/// A live session whose user is no longer an admin.
pub const STALE_TOKEN: &str = "stale-token";

/// Content rows returned for any SELECT on a whitelisted table.
pub type Rows = Arc<dyn Fn(&QueryBuf) -> Vec<Value> + Send + Sync>;

/// In-memory database that knows one admin, two sessions, and answers content reads from `rows`.
pub fn fake_db(password_hash: Option<String>, rows: Rows) -> ScriptedExecutor {
    ScriptedExecutor::new(move |q| {
        let first = q.params.first().and_then(Value::as_str).unwrap_or_default().to_string();
        if q.sql.contains("FROM sessions WHERE token") {
            return Ok(match first.as_str() {
                ADMIN_TOKEN => vec![json!({"user_id": ADMIN_ID, "token": ADMIN_TOKEN})],
                STALE_TOKEN => vec![json!({"user_id": "00000000-0000-0000-0000-000000000000", "token": STALE_TOKEN})],
                _ => vec![],
            });
        }
        if q.sql.contains("FROM admin_users WHERE id::text") {
            return Ok(if first == ADMIN_ID {
                vec![json!({"id": ADMIN_ID, "email": ADMIN_EMAIL, "full_name": "Site Admin", "password_hash": password_hash})]
            } else {
                vec![]
            });
        }
        if q.sql.contains("FROM admin_users WHERE LOWER(TRIM(email))") {
            if q.sql.contains("id::text <>") {
                return Ok(if first == "taken@site.io" { vec![json!({"id": "other"})] } else { vec![] });
            }
            return Ok(match (&password_hash, first == ADMIN_EMAIL) {
                (Some(hash), true) => vec![json!({
                    "id": ADMIN_ID, "email": ADMIN_EMAIL, "full_name": "Site Admin", "password_hash": hash
                })],
                _ => vec![],
            });
        }
        if q.sql.starts_with("INSERT INTO \"") {
            return Ok(vec![json!({"id": 41})]);
        }
        if q.sql.starts_with("INSERT") || q.sql.starts_with("UPDATE") || q.sql.starts_with("DELETE") {
            return Ok(vec![json!({})]);
        }
        Ok((*rows)(q))
    })
}

/// A database that fails every statement with a driver error.
pub fn failing_db() -> ScriptedExecutor {
    ScriptedExecutor::new(|q| {
        if q.sql.contains("FROM sessions") {
            return Ok(vec![json!({"user_id": ADMIN_ID, "token": ADMIN_TOKEN})]);
        }
        if q.sql.contains("FROM admin_users") {
            return Ok(vec![json!({"id": ADMIN_ID, "email": ADMIN_EMAIL, "full_name": null})]);
        }
        Err(DbError {
            message: "column \"nope\" does not exist".into(),
            code: Some("42703".into()),
            sql: q.sql.clone(),
            params: q.params.clone(),
        })
    })
}

pub fn settings(expose_sql_errors: bool) -> Settings {
    let expose = expose_sql_errors.to_string();
    Settings::from_lookup(move |k| match k {
        "DATABASE_URL" => Some("postgres://localhost/cms_test".to_string()),
        "EXPOSE_SQL_ERRORS" => Some(expose.clone()),
        _ => None,
    })
    .unwrap()
}

pub fn state(db: Arc<ScriptedExecutor>, expose_sql_errors: bool) -> AppState {
    let mut tables = TableRegistry::builtin();
    tables.record_column_types(vec![
        ("news".to_string(), "id".to_string(), "int8".to_string()),
        ("news".to_string(), "updated_at".to_string(), "timestamptz".to_string()),
        ("services".to_string(), "id".to_string(), "int8".to_string()),
    ]);
    AppState::new(db, tables, settings(expose_sql_errors))
}

pub fn router(db: Arc<ScriptedExecutor>) -> Router {
    app(state(db, true))
}

pub fn no_rows() -> Rows {
    Arc::new(|_| Vec::new())
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::COOKIE, format!("admin_session={}", t));
    }
    match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Statements that touched content (anything besides session and admin lookups).
pub fn content_sql(db: &ScriptedExecutor) -> Vec<String> {
    db.sql_log()
        .into_iter()
        .filter(|s| !s.contains("FROM sessions") && !s.contains("FROM admin_users"))
        .collect()
}
