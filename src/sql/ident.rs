//! Identifier sanitizing: every table, column and order-by name passes through here before it is interpolated.

use regex::Regex;
use std::sync::OnceLock;

static UNSAFE_IDENT_CHARS: OnceLock<Regex> = OnceLock::new();

fn unsafe_chars() -> &'static Regex {
    UNSAFE_IDENT_CHARS.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("static identifier pattern"))
}

/// Strip every character outside `[A-Za-z0-9_]`. Values never go through this; they are bound.
pub fn sanitize_identifier(raw: &str) -> String {
    unsafe_chars().replace_all(raw, "").into_owned()
}

/// Sanitize, returning None when nothing survives.
pub fn sanitized_non_empty(raw: &str) -> Option<String> {
    let s = sanitize_identifier(raw);
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Double-quote an identifier for PostgreSQL. Callers pass sanitized names only.
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_everything_outside_the_allowed_set() {
        assert_eq!(sanitize_identifier("services; DROP TABLE x--"), "servicesDROPTABLEx");
        assert_eq!(sanitize_identifier("order_index"), "order_index");
        assert_eq!(sanitize_identifier("`id`"), "id");
        assert_eq!(sanitize_identifier("naïve-col"), "navecol");
        assert_eq!(sanitize_identifier("\"quoted\".name"), "quotedname");
    }

    #[test]
    fn sanitizing_is_idempotent() {
        for raw in ["hero_sections", "a b c", "x'); --", "", "ÄÖÜ", "col$1", "T_9"] {
            let once = sanitize_identifier(raw);
            assert_eq!(sanitize_identifier(&once), once);
        }
    }

    #[test]
    fn empty_result_is_none() {
        assert_eq!(sanitized_non_empty("!!!"), None);
        assert_eq!(sanitized_non_empty(""), None);
        assert_eq!(sanitized_non_empty("news"), Some("news".into()));
    }

    #[test]
    fn quoting_wraps_in_double_quotes() {
        assert_eq!(quoted("services"), "\"services\"");
    }
}
