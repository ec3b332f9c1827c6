//! Body checks for create and update.

use crate::error::AppError;
use crate::sql::sanitize_identifier;
use serde_json::{Map, Value};
use std::collections::HashSet;

pub struct RowValidator;

impl RowValidator {
    /// Body must be a non-empty object whose keys each survive sanitizing, without two keys collapsing together.
    pub fn columns(body: &Value) -> Result<Map<String, Value>, AppError> {
        let Value::Object(map) = body else {
            return Err(AppError::Validation("Request body must be a JSON object".into()));
        };
        if map.is_empty() {
            return Err(AppError::Validation("Request body must not be empty".into()));
        }
        let mut seen = HashSet::new();
        let mut out = Map::new();
        for (k, v) in map {
            let col = sanitize_identifier(k);
            if col.is_empty() {
                return Err(AppError::Validation(format!("Invalid column name: {}", k)));
            }
            if !seen.insert(col.clone()) {
                return Err(AppError::Validation(format!("Duplicate column after sanitizing: {}", col)));
            }
            out.insert(col, v.clone());
        }
        Ok(out)
    }
}
