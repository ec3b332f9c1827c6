//! Parse JSON documents stored as text back into structured values.

use crate::config::{JsonFieldMode, TableSpec};
use serde_json::Value;

fn parse_document(s: &str) -> Option<Value> {
    if !(s.starts_with('[') || s.starts_with('{')) {
        return None;
    }
    match serde_json::from_str::<Value>(s) {
        Ok(v @ (Value::Array(_) | Value::Object(_))) => Some(v),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "text column is not valid JSON; left as-is");
            None
        }
    }
}

/// Replace JSON-looking text fields in place. Failures leave the raw string.
pub fn unstringify(row: &mut Value, table: &TableSpec, mode: JsonFieldMode) {
    let Value::Object(map) = row else { return };
    for (col, v) in map.iter_mut() {
        if mode == JsonFieldMode::Declared && !table.json_columns.contains(col) {
            continue;
        }
        if let Value::String(s) = v {
            if let Some(parsed) = parse_document(s) {
                *v = parsed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableRegistry;
    use serde_json::json;

    fn footer() -> TableSpec {
        TableRegistry::builtin().get("footer_settings").cloned().unwrap()
    }

    #[test]
    fn declared_columns_are_parsed() {
        let mut row = json!({
            "quick_links": "[{\"label\":\"Home\",\"href\":\"/\"}]",
            "description": "{not parsed because undeclared}",
        });
        unstringify(&mut row, &footer(), JsonFieldMode::Declared);
        assert_eq!(row["quick_links"], json!([{"label": "Home", "href": "/"}]));
        assert_eq!(row["description"], json!("{not parsed because undeclared}"));
    }

    #[test]
    fn sniffing_tries_any_bracketed_text() {
        let mut row = json!({"description": "{\"a\":1}", "copyright_text": "[c] 2024"});
        unstringify(&mut row, &footer(), JsonFieldMode::Sniff);
        assert_eq!(row["description"], json!({"a": 1}));
        assert_eq!(row["copyright_text"], json!("[c] 2024"));
    }

    #[test]
    fn sniffing_checks_the_raw_prefix() {
        let mut row = json!({"description": "  [1]", "copyright_text": "[1]"});
        unstringify(&mut row, &footer(), JsonFieldMode::Sniff);
        assert_eq!(row["description"], json!("  [1]"));
        assert_eq!(row["copyright_text"], json!([1]));
    }

    #[test]
    fn malformed_json_is_left_alone() {
        let mut row = json!({"legal_links": "[oops"});
        unstringify(&mut row, &footer(), JsonFieldMode::Declared);
        assert_eq!(row["legal_links"], json!("[oops"));
    }

    #[test]
    fn scalars_in_declared_columns_stay_text() {
        let mut row = json!({"quick_links": "42"});
        unstringify(&mut row, &footer(), JsonFieldMode::Declared);
        assert_eq!(row["quick_links"], json!("42"));
    }
}
