//! Admin account maintenance shared by the auth routes and `cms-admin`.

use super::password::{check_new_password, hash_password, verify_password};
use super::session::AdminUser;
use crate::db::Executor;
use crate::error::AppError;
use crate::sql::QueryBuf;
use serde_json::{json, Value};

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn check_email(email: &str) -> Result<(), AppError> {
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email address is required".into()));
    }
    Ok(())
}

/// Admin and stored hash for a normalized email.
pub async fn find_admin_by_email(db: &dyn Executor, email: &str) -> Result<Option<(AdminUser, String)>, AppError> {
    let q = QueryBuf::raw(
        "SELECT id::text AS id, email, full_name, password_hash FROM admin_users WHERE LOWER(TRIM(email)) = $1",
        vec![json!(email)],
    );
    let row = db.fetch_optional(&q).await?;
    Ok(row.and_then(|r| {
        let hash = r.get("password_hash")?.as_str()?.to_string();
        Some((AdminUser::from_row(&r)?, hash))
    }))
}

async fn email_taken_by_other(db: &dyn Executor, email: &str, user_id: Option<&str>) -> Result<bool, AppError> {
    let q = QueryBuf::raw(
        "SELECT id::text AS id FROM admin_users WHERE LOWER(TRIM(email)) = $1 AND ($2::text IS NULL OR id::text <> $2)",
        vec![json!(email), user_id.map(Value::from).unwrap_or(Value::Null)],
    );
    Ok(db.fetch_optional(&q).await?.is_some())
}

pub async fn create_admin(
    db: &dyn Executor,
    email: &str,
    password: &str,
    full_name: Option<&str>,
) -> Result<AdminUser, AppError> {
    let email = normalize_email(email);
    check_email(&email)?;
    check_new_password(password)?;
    if email_taken_by_other(db, &email, None).await? {
        return Err(AppError::Validation("Email already in use".into()));
    }
    let hash = hash_password(password).await?;
    let q = QueryBuf::raw(
        "INSERT INTO admin_users (email, password_hash, full_name) VALUES ($1, $2, $3) \
         RETURNING id::text AS id, email, full_name",
        vec![json!(email), json!(hash), full_name.map(Value::from).unwrap_or(Value::Null)],
    );
    let row = db
        .fetch_optional(&q)
        .await?
        .ok_or_else(|| AppError::Internal("insert returned no row".into()))?;
    let user = AdminUser::from_row(&row).ok_or_else(|| AppError::Internal("unexpected admin row shape".into()))?;
    tracing::info!(user_id = %user.id, email = %user.email, "admin created");
    Ok(user)
}

/// Overwrite the password of the admin with this email (operator reset, no current password).
pub async fn reset_password(db: &dyn Executor, email: &str, new_password: &str) -> Result<AdminUser, AppError> {
    check_new_password(new_password)?;
    let email = normalize_email(email);
    let (user, _) = find_admin_by_email(db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No admin with email {}", email)))?;
    store_password(db, &user.id, new_password).await?;
    tracing::info!(user_id = %user.id, "admin password reset");
    Ok(user)
}

/// Self-service change: the current password must match.
pub async fn change_password(
    db: &dyn Executor,
    user_id: &str,
    current_password: &str,
    new_password: &str,
) -> Result<(), AppError> {
    if current_password.is_empty() || new_password.is_empty() {
        return Err(AppError::Validation("Current and new password are required".into()));
    }
    check_new_password(new_password)?;
    let q = QueryBuf::raw(
        "SELECT password_hash FROM admin_users WHERE id::text = $1",
        vec![json!(user_id)],
    );
    let hash = db
        .fetch_optional(&q)
        .await?
        .and_then(|r| r.get("password_hash").and_then(Value::as_str).map(str::to_string))
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    if !verify_password(current_password, &hash).await? {
        return Err(AppError::Validation("Current password is incorrect".into()));
    }
    store_password(db, user_id, new_password).await
}

async fn store_password(db: &dyn Executor, user_id: &str, new_password: &str) -> Result<(), AppError> {
    let hash = hash_password(new_password).await?;
    let q = QueryBuf::raw(
        "UPDATE admin_users SET password_hash = $1 WHERE id::text = $2",
        vec![json!(hash), json!(user_id)],
    );
    db.execute(&q).await?;
    Ok(())
}

/// Returns the normalized email that was stored.
pub async fn change_email(db: &dyn Executor, user_id: &str, email: &str) -> Result<String, AppError> {
    let email = normalize_email(email);
    check_email(&email)?;
    if email_taken_by_other(db, &email, Some(user_id)).await? {
        return Err(AppError::Validation("Email already in use".into()));
    }
    let q = QueryBuf::raw(
        "UPDATE admin_users SET email = $1 WHERE id::text = $2",
        vec![json!(email), json!(user_id)],
    );
    db.execute(&q).await?;
    Ok(email)
}

pub async fn count_admins(db: &dyn Executor) -> Result<i64, AppError> {
    let q = QueryBuf::raw("SELECT COUNT(*) AS n FROM admin_users", vec![]);
    Ok(db
        .fetch_optional(&q)
        .await?
        .and_then(|r| r.get("n").and_then(Value::as_i64))
        .unwrap_or(0))
}
