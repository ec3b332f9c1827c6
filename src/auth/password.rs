//! Password hashing with bcrypt, run on the blocking pool.

use crate::error::AppError;

pub const PASSWORD_HASH_COST: u32 = 10;

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, PASSWORD_HASH_COST))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("hashing failed: {}", e)))
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let verdict = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("verify task failed: {}", e)))?;
    match verdict {
        Ok(ok) => Ok(ok),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash could not be checked");
            Ok(false)
        }
    }
}

pub fn check_new_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
