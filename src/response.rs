//! Small response bodies shared by handlers.

use axum::Json;
use serde::Serialize;

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Success {
    pub success: bool,
}

/// `{ "success": true }`
pub fn success() -> Json<Success> {
    Json(Success { success: true })
}
