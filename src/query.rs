//! Query descriptor shared by the table endpoint, the SQL builder and both client shims.
//!
//! A `SelectQuery` accumulates filters, ordering and a limit until a terminal call executes it.
//! The endpoint builds one from query-string pairs; the remote shim turns one back into pairs.

use crate::error::AppError;
use crate::sql::{sanitize_identifier, sanitized_non_empty};
use serde_json::Value;

/// Selects every column.
pub const ALL_COLUMNS: &str = "*";

/// Query-string keys that are never treated as filters.
pub const RESERVED_KEYS: [&str; 4] = ["orderBy", "ascending", "limit", "single"];

#[derive(Clone, Debug, PartialEq)]
pub enum FilterOp {
    Eq(Value),
    In(Vec<Value>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn new(column: impl Into<String>, ascending: bool) -> Self {
        OrderBy {
            column: column.into(),
            ascending,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    /// `*` or a comma-separated column list.
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<u32>,
    pub single: bool,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        SelectQuery {
            table: table.into(),
            columns: ALL_COLUMNS.to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
            single: false,
        }
    }

    /// Parse endpoint query-string pairs (in URL order) into a read query.
    ///
    /// Repeated keys collapse into one IN filter, keeping the position of the first occurrence.
    /// Empty values and keys that sanitize to nothing are skipped.
    pub fn from_query_pairs(table: impl Into<String>, pairs: &[(String, String)]) -> Result<Self, AppError> {
        let mut q = SelectQuery::new(table);
        let mut grouped: Vec<(String, Vec<Value>)> = Vec::new();
        let mut order_column: Option<String> = None;
        let mut ascending = true;
        let mut limit_raw: Option<&str> = None;
        let mut single = false;

        for (key, value) in pairs {
            match key.as_str() {
                "orderBy" => order_column = Some(value.clone()),
                "ascending" => ascending = value != "false",
                "limit" => limit_raw = Some(value.as_str()),
                "single" => single = value == "true",
                _ => {
                    if value.is_empty() {
                        continue;
                    }
                    let Some(column) = sanitized_non_empty(key) else {
                        continue;
                    };
                    match grouped.iter_mut().find(|(c, _)| *c == column) {
                        Some((_, values)) => values.push(Value::String(value.clone())),
                        None => grouped.push((column, vec![Value::String(value.clone())])),
                    }
                }
            }
        }

        q.filters = grouped
            .into_iter()
            .map(|(column, mut values)| {
                let op = if values.len() == 1 {
                    FilterOp::Eq(values.remove(0))
                } else {
                    FilterOp::In(values)
                };
                Filter { column, op }
            })
            .collect();

        q.order = order_column
            .and_then(|c| sanitized_non_empty(&c))
            .map(|column| OrderBy { column, ascending });

        if let Some(raw) = limit_raw {
            let n: u32 = raw
                .trim()
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| AppError::Validation("limit must be a positive integer".into()))?;
            q.limit = Some(n);
        }
        q.single = single || limit_raw.map(str::trim) == Some("1");
        Ok(q)
    }

    /// Inverse of `from_query_pairs`, used by the remote shim. IN filters become repeated keys.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for f in &self.filters {
            match &f.op {
                FilterOp::Eq(v) => pairs.push((f.column.clone(), value_to_query_text(v))),
                FilterOp::In(values) => {
                    for v in values {
                        pairs.push((f.column.clone(), value_to_query_text(v)));
                    }
                }
            }
        }
        if let Some(order) = &self.order {
            pairs.push(("orderBy".into(), order.column.clone()));
            pairs.push(("ascending".into(), order.ascending.to_string()));
        }
        if let Some(n) = self.limit {
            pairs.push(("limit".into(), n.to_string()));
        }
        if self.single {
            pairs.push(("single".into(), "true".into()));
        }
        pairs
    }

    /// Sanitized column names, or None for all columns.
    pub fn column_list(&self) -> Option<Vec<String>> {
        let trimmed = self.columns.trim();
        if trimmed.is_empty() || trimmed == ALL_COLUMNS {
            return None;
        }
        let cols: Vec<String> = trimmed
            .split(',')
            .map(sanitize_identifier)
            .filter(|c| !c.is_empty())
            .collect();
        if cols.is_empty() {
            None
        } else {
            Some(cols)
        }
    }
}

/// The one `(column, value)` pair an update or delete is scoped to.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    column: String,
    value: Value,
}

impl Predicate {
    pub fn new(column: &str, value: Value) -> Result<Self, AppError> {
        let column = sanitized_non_empty(column).ok_or_else(|| AppError::Validation("Invalid column name".into()))?;
        let missing = match &value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if missing {
            return Err(AppError::Validation("Missing where clause".into()));
        }
        Ok(Predicate { column, value })
    }

    /// Only the first pair in URL order scopes the write; the rest are ignored.
    pub fn first_of(pairs: &[(String, String)]) -> Result<Self, AppError> {
        let (column, value) = pairs
            .first()
            .ok_or_else(|| AppError::Validation("Missing where clause".into()))?;
        if value.is_empty() {
            return Err(AppError::Validation("Missing where clause".into()));
        }
        if pairs.len() > 1 {
            tracing::debug!(column = %column, ignored = pairs.len() - 1, "extra filter keys ignored for scoped write");
        }
        Predicate::new(column, Value::String(value.clone()))
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Text form of a filter value as it travels in a query string.
pub fn value_to_query_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn repeated_keys_become_in_filter_in_order() {
        let q = SelectQuery::from_query_pairs("news", &pairs(&[("id", "3"), ("category", "x"), ("id", "1"), ("id", "2")])).unwrap();
        assert_eq!(
            q.filters,
            vec![
                Filter {
                    column: "id".into(),
                    op: FilterOp::In(vec![json!("3"), json!("1"), json!("2")]),
                },
                Filter {
                    column: "category".into(),
                    op: FilterOp::Eq(json!("x")),
                },
            ]
        );
    }

    #[test]
    fn reserved_keys_are_not_filters() {
        let q = SelectQuery::from_query_pairs(
            "services",
            &pairs(&[("orderBy", "order_index"), ("ascending", "false"), ("limit", "2")]),
        )
        .unwrap();
        assert!(q.filters.is_empty());
        assert_eq!(q.order, Some(OrderBy::new("order_index", false)));
        assert_eq!(q.limit, Some(2));
        assert!(!q.single);
    }

    #[test]
    fn ascending_is_true_unless_literal_false() {
        for (raw, expected) in [("true", true), ("no", true), ("FALSE", true), ("false", false)] {
            let q = SelectQuery::from_query_pairs("news", &pairs(&[("orderBy", "title"), ("ascending", raw)])).unwrap();
            assert_eq!(q.order.unwrap().ascending, expected, "ascending={}", raw);
        }
    }

    #[test]
    fn order_by_that_sanitizes_to_nothing_is_dropped() {
        let q = SelectQuery::from_query_pairs("news", &pairs(&[("orderBy", "--;")])).unwrap();
        assert_eq!(q.order, None);
    }

    #[test]
    fn limit_one_or_single_flag_narrows() {
        let q = SelectQuery::from_query_pairs("news", &pairs(&[("limit", "1")])).unwrap();
        assert!(q.single);
        let q = SelectQuery::from_query_pairs("news", &pairs(&[("single", "true")])).unwrap();
        assert!(q.single);
        let q = SelectQuery::from_query_pairs("news", &pairs(&[("single", "yes")])).unwrap();
        assert!(!q.single);
    }

    #[test]
    fn bad_limit_is_rejected() {
        for raw in ["abc", "0", "-3", ""] {
            let err = SelectQuery::from_query_pairs("news", &pairs(&[("limit", raw)])).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "limit={}", raw);
        }
    }

    #[test]
    fn empty_values_and_unsafe_keys_are_skipped() {
        let q = SelectQuery::from_query_pairs("news", &pairs(&[("title", ""), ("$$", "x"), ("ti-tle", "y")])).unwrap();
        assert_eq!(
            q.filters,
            vec![Filter {
                column: "title".into(),
                op: FilterOp::Eq(json!("y")),
            }]
        );
    }

    #[test]
    fn query_pairs_survive_the_wire() {
        let mut q = SelectQuery::new("news");
        q.filters.push(Filter {
            column: "is_featured".into(),
            op: FilterOp::Eq(json!(true)),
        });
        q.filters.push(Filter {
            column: "id".into(),
            op: FilterOp::In(vec![json!(1), json!(2)]),
        });
        q.order = Some(OrderBy::new("published_at", false));
        q.limit = Some(5);
        let wire = q.to_query_pairs();
        assert_eq!(
            wire,
            pairs(&[
                ("is_featured", "true"),
                ("id", "1"),
                ("id", "2"),
                ("orderBy", "published_at"),
                ("ascending", "false"),
                ("limit", "5"),
            ])
        );
        let back = SelectQuery::from_query_pairs("news", &wire).unwrap();
        assert_eq!(back.filters[1].op, FilterOp::In(vec![json!("1"), json!("2")]));
        assert_eq!(back.order, q.order);
        assert_eq!(back.limit, Some(5));
    }

    #[test]
    fn column_list_is_sanitized() {
        let mut q = SelectQuery::new("site_settings");
        assert_eq!(q.column_list(), None);
        q.columns = "setting_key, setting_value;--".into();
        assert_eq!(q.column_list(), Some(vec!["setting_key".to_string(), "setting_value".to_string()]));
        q.columns = " , ".into();
        assert_eq!(q.column_list(), None);
    }

    #[test]
    fn predicate_takes_first_pair_only() {
        let p = Predicate::first_of(&pairs(&[("id", "5"), ("name", "X")])).unwrap();
        assert_eq!(p.column(), "id");
        assert_eq!(p.value(), &json!("5"));
    }

    #[test]
    fn predicate_requires_column_and_value() {
        assert!(matches!(Predicate::first_of(&[]), Err(AppError::Validation(_))));
        assert!(matches!(Predicate::first_of(&pairs(&[("id", "")])), Err(AppError::Validation(_))));
        let err = Predicate::new("'';", json!(1)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid column name");
        let err = Predicate::new("id", Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "Missing where clause");
    }
}
