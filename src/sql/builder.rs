//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for one whitelisted table.

use super::ident::{quoted, sanitize_identifier};
use crate::config::TableSpec;
use crate::query::{FilterOp, Predicate, SelectQuery};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Fixed SQL with positional params.
    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        QueryBuf {
            sql: sql.into(),
            params,
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Push a value and return its placeholder, cast to the column type when it is known.
    fn placeholder(&mut self, table: &TableSpec, column: &str, v: Value) -> String {
        let n = self.push_param(v);
        table
            .column_type(column)
            .map(|t| format!("${}::{}", n, t))
            .unwrap_or_else(|| format!("${}", n))
    }
}

fn select_column_list(q: &SelectQuery) -> String {
    match q.column_list() {
        Some(cols) => cols.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", "),
        None => "*".to_string(),
    }
}

/// SELECT with AND-ed equality / IN filters in descriptor order, optional ORDER BY and LIMIT.
/// An IN filter with no values matches nothing. A single-row query with no explicit limit gets LIMIT 1.
pub fn select(table: &TableSpec, query: &SelectQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for f in &query.filters {
        let col = sanitize_identifier(&f.column);
        if col.is_empty() {
            continue;
        }
        match &f.op {
            FilterOp::Eq(v) => {
                let ph = q.placeholder(table, &col, v.clone());
                where_parts.push(format!("{} = {}", quoted(&col), ph));
            }
            FilterOp::In(values) if values.is_empty() => where_parts.push("1 = 0".to_string()),
            FilterOp::In(values) => {
                let phs: Vec<String> = values.iter().map(|v| q.placeholder(table, &col, v.clone())).collect();
                where_parts.push(format!("{} IN ({})", quoted(&col), phs.join(", ")));
            }
        }
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };

    let order_clause = query
        .order
        .as_ref()
        .map(|o| sanitize_identifier(&o.column))
        .filter(|c| !c.is_empty())
        .map(|c| {
            let dir = if query.order.as_ref().map(|o| o.ascending).unwrap_or(true) {
                "ASC"
            } else {
                "DESC"
            };
            format!(" ORDER BY {} {}", quoted(&c), dir)
        })
        .unwrap_or_default();

    let limit = query.limit.or(if query.single { Some(1) } else { None });
    let limit_clause = match limit {
        Some(n) => {
            let k = q.push_param(Value::from(n));
            format!(" LIMIT ${}::int8", k)
        }
        None => String::new(),
    };

    q.sql = format!(
        "SELECT {} FROM {}{}{}{}",
        select_column_list(query),
        quoted(table.name()),
        where_clause,
        order_clause,
        limit_clause
    );
    q
}

/// INSERT of the supplied columns, returning the generated primary key.
/// Keys that sanitize to nothing are skipped; callers reject those before building.
pub fn insert(table: &TableSpec, row: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (k, v) in row {
        let col = sanitize_identifier(k);
        if col.is_empty() {
            continue;
        }
        placeholders.push(q.placeholder(table, &col, v.clone()));
        cols.push(quoted(&col));
    }
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quoted(table.name()),
            quoted(table.primary_key())
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quoted(table.name()),
            cols.join(", "),
            placeholders.join(", "),
            quoted(table.primary_key())
        )
    };
    q
}

/// UPDATE of the patch columns on rows where `predicate` matches.
/// Touches `updated_at` when the table has one and the patch does not set it.
pub fn update(table: &TableSpec, patch: &Map<String, Value>, predicate: &Predicate) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    let mut touched_updated_at = false;
    for (k, v) in patch {
        let col = sanitize_identifier(k);
        if col.is_empty() {
            continue;
        }
        if col == "updated_at" {
            touched_updated_at = true;
        }
        let ph = q.placeholder(table, &col, v.clone());
        sets.push(format!("{} = {}", quoted(&col), ph));
    }
    if !touched_updated_at && table.has_column("updated_at") {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let where_col = sanitize_identifier(predicate.column());
    let where_ph = q.placeholder(table, &where_col, predicate.value().clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quoted(table.name()),
        sets.join(", "),
        quoted(&where_col),
        where_ph
    );
    q
}

/// DELETE of rows where `predicate` matches.
pub fn delete(table: &TableSpec, predicate: &Predicate) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_col = sanitize_identifier(predicate.column());
    let where_ph = q.placeholder(table, &where_col, predicate.value().clone());
    q.sql = format!("DELETE FROM {} WHERE {} = {}", quoted(table.name()), quoted(&where_col), where_ph);
    q
}
