//! Sessions: token → user, admin membership, sign-in and sign-out.

use super::accounts::{find_admin_by_email, normalize_email};
use super::password::verify_password;
use crate::db::Executor;
use crate::error::AppError;
use crate::sql::QueryBuf;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};

/// The user behind a live session cookie. Membership in `admin_users` is checked separately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub session_token: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
}

impl AdminUser {
    pub(crate) fn from_row(row: &Value) -> Option<Self> {
        Some(AdminUser {
            id: row.get("id")?.as_str()?.to_string(),
            email: row.get("email")?.as_str()?.to_string(),
            full_name: row.get("full_name").and_then(Value::as_str).map(str::to_string),
        })
    }
}

/// Result of a successful sign-in.
#[derive(Clone, Debug)]
pub struct SignedIn {
    pub user: AdminUser,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub fn generate_session_token() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}

/// Live (unexpired) session for a token.
pub async fn find_session(db: &dyn Executor, token: &str) -> Result<Option<SessionUser>, AppError> {
    let q = QueryBuf::raw(
        "SELECT user_id::text AS user_id, token FROM sessions WHERE token = $1 AND expires_at > NOW()",
        vec![json!(token)],
    );
    let row = db.fetch_optional(&q).await?;
    Ok(row.and_then(|r| {
        Some(SessionUser {
            id: r.get("user_id")?.as_str()?.to_string(),
            session_token: r.get("token")?.as_str()?.to_string(),
        })
    }))
}

pub async fn find_admin(db: &dyn Executor, user_id: &str) -> Result<Option<AdminUser>, AppError> {
    let q = QueryBuf::raw(
        "SELECT id::text AS id, email, full_name FROM admin_users WHERE id::text = $1",
        vec![json!(user_id)],
    );
    Ok(db.fetch_optional(&q).await?.as_ref().and_then(AdminUser::from_row))
}

pub async fn is_admin(db: &dyn Executor, user_id: &str) -> Result<bool, AppError> {
    Ok(find_admin(db, user_id).await?.is_some())
}

/// Admin behind a session token, if any. No token means no query.
pub async fn current_admin(db: &dyn Executor, token: Option<&str>) -> Result<Option<AdminUser>, AppError> {
    let Some(token) = token else { return Ok(None) };
    match find_session(db, token).await? {
        Some(session) => find_admin(db, &session.id).await,
        None => Ok(None),
    }
}

/// Like `current_admin`, but a missing or non-admin session is a 401.
pub async fn require_admin(db: &dyn Executor, token: Option<&str>) -> Result<AdminUser, AppError> {
    current_admin(db, token).await?.ok_or(AppError::Unauthorized)
}

pub async fn sign_in(db: &dyn Executor, email: &str, password: &str, session_days: i64) -> Result<SignedIn, AppError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Email and password are required".into()));
    }
    let Some((user, hash)) = find_admin_by_email(db, &email).await? else {
        tracing::info!(email = %email, "sign-in for unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(password, &hash).await? {
        tracing::info!(email = %email, "sign-in with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = generate_session_token();
    let expires_at = Utc::now() + Duration::days(session_days);
    let q = QueryBuf::raw(
        "INSERT INTO sessions (user_id, token, expires_at) VALUES ($1::uuid, $2, $3::timestamptz)",
        vec![json!(user.id), json!(token), json!(expires_at.to_rfc3339())],
    );
    db.execute(&q).await?;
    tracing::info!(user_id = %user.id, "admin signed in");
    Ok(SignedIn { user, token, expires_at })
}

pub async fn sign_out(db: &dyn Executor, token: &str) -> Result<(), AppError> {
    let q = QueryBuf::raw("DELETE FROM sessions WHERE token = $1", vec![json!(token)]);
    db.execute(&q).await?;
    Ok(())
}

/// Drop expired sessions; returns how many went.
pub async fn purge_expired_sessions(db: &dyn Executor) -> Result<u64, AppError> {
    let q = QueryBuf::raw("DELETE FROM sessions WHERE expires_at <= NOW()", vec![]);
    Ok(db.execute(&q).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_long_and_unique() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn admin_row_decoding() {
        let row = json!({"id": "0b9f", "email": "a@x.io", "full_name": null});
        assert_eq!(
            AdminUser::from_row(&row),
            Some(AdminUser {
                id: "0b9f".into(),
                email: "a@x.io".into(),
                full_name: None,
            })
        );
        assert_eq!(AdminUser::from_row(&json!({"id": "1"})), None);
    }
}
