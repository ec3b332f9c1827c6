//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("column discovery: {0}")]
    Discovery(String),
}

/// A failed statement, captured where it ran.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct DbError {
    pub message: String,
    /// SQLSTATE from the driver, when there is one.
    pub code: Option<String>,
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Db(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Drop the SQL text before the error reaches a client that should not see it.
    pub fn redact_sql(self, expose: bool) -> Self {
        match self {
            AppError::Db(mut e) if !expose => {
                e.sql.clear();
                AppError::Db(e)
            }
            other => other,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Db(e) => ErrorBody {
                error: e.message,
                details: Some(e.code.unwrap_or_else(|| "UNKNOWN".to_string())),
                sql: Some(e.sql).filter(|s| !s.is_empty()),
            },
            AppError::Config(e) => {
                tracing::error!(error = %e, "configuration error surfaced in request");
                ErrorBody {
                    error: "Internal server error".to_string(),
                    details: None,
                    sql: None,
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                details: None,
                sql: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn db_error() -> AppError {
        AppError::Db(DbError {
            message: "column \"nope\" does not exist".into(),
            code: Some("42703".into()),
            sql: "SELECT * FROM \"news\" WHERE \"nope\" = $1".into(),
            params: vec![json!("x")],
        })
    }

    #[test]
    fn statuses() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(db_error().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn redaction_clears_only_when_hidden() {
        match db_error().redact_sql(true) {
            AppError::Db(e) => assert!(!e.sql.is_empty()),
            _ => unreachable!(),
        }
        match db_error().redact_sql(false) {
            AppError::Db(e) => assert!(e.sql.is_empty()),
            _ => unreachable!(),
        }
    }
}
