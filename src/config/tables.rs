//! Table whitelist: the only tables the generic endpoint and the shims will touch.
//!
//! Column types are discovered from `information_schema.columns` at startup and used for `$n::type` casts.

use crate::db::Executor;
use crate::error::{AppError, ConfigError};
use crate::sql::{sanitized_non_empty, QueryBuf};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Who may do what with a table through the generic endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableAccess {
    /// Reads require an admin session.
    pub admin_read: bool,
    /// Updates and deletes through the generic endpoint are refused outright.
    pub locked_writes: bool,
}

#[derive(Clone, Debug)]
pub struct TableSpec {
    name: String,
    primary_key: String,
    pub access: TableAccess,
    /// Columns holding JSON documents stored as text.
    pub json_columns: HashSet<String>,
    /// Columns stripped from every response.
    pub sensitive_columns: HashSet<String>,
    /// PostgreSQL udt names by column, empty until discovery runs.
    column_types: HashMap<String, String>,
}

impl TableSpec {
    fn new(name: &str) -> Self {
        TableSpec {
            name: name.to_string(),
            primary_key: "id".to_string(),
            access: TableAccess::default(),
            json_columns: HashSet::new(),
            sensitive_columns: HashSet::new(),
            column_types: HashMap::new(),
        }
    }

    fn json(mut self, cols: &[&str]) -> Self {
        self.json_columns.extend(cols.iter().map(|c| c.to_string()));
        self
    }

    fn sensitive(mut self, cols: &[&str]) -> Self {
        self.sensitive_columns.extend(cols.iter().map(|c| c.to_string()));
        self
    }

    fn access(mut self, access: TableAccess) -> Self {
        self.access = access;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn column_type(&self, column: &str) -> Option<&str> {
        self.column_types.get(column).map(String::as_str)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_types.contains_key(column)
    }

    /// Remove sensitive columns from a row in place.
    pub fn strip_sensitive(&self, row: &mut Value) {
        if let Value::Object(map) = row {
            for col in &self.sensitive_columns {
                map.remove(col);
            }
        }
    }
}

/// The fixed set of content tables plus the admin tables.
#[derive(Clone, Debug)]
pub struct TableRegistry {
    tables: HashMap<String, TableSpec>,
}

pub const CONTENT_TABLES: [&str; 10] = [
    "services",
    "features",
    "categories",
    "hero_sections",
    "news",
    "contact_requests",
    "site_settings",
    "logos",
    "header_settings",
    "footer_settings",
];

impl TableRegistry {
    pub fn builtin() -> Self {
        let specs = vec![
            TableSpec::new("services").json(&["gallery_images"]),
            TableSpec::new("features"),
            TableSpec::new("categories"),
            TableSpec::new("hero_sections"),
            TableSpec::new("news"),
            TableSpec::new("contact_requests").access(TableAccess {
                admin_read: true,
                locked_writes: false,
            }),
            TableSpec::new("site_settings"),
            TableSpec::new("logos"),
            TableSpec::new("header_settings").json(&["navigation_links"]),
            TableSpec::new("footer_settings").json(&["quick_links", "legal_links"]),
            TableSpec::new("admin_users")
                .sensitive(&["password_hash"])
                .access(TableAccess {
                    admin_read: true,
                    locked_writes: true,
                }),
        ];
        TableRegistry {
            tables: specs.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.tables.get(name)
    }

    /// Sanitize a caller-supplied table name and look it up.
    /// An empty name is a 400; anything outside the whitelist is a 403.
    pub fn resolve(&self, raw: &str) -> Result<&TableSpec, AppError> {
        let name = sanitized_non_empty(raw).ok_or_else(|| AppError::Validation("Invalid table name".into()))?;
        self.tables.get(&name).ok_or_else(|| {
            tracing::warn!(table = %name, "table not in whitelist");
            AppError::Forbidden("Table not allowed".into())
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Record `(table, column, udt_name)` triples; rows for unknown tables are ignored.
    pub fn record_column_types(&mut self, rows: impl IntoIterator<Item = (String, String, String)>) {
        for (table, column, udt) in rows {
            if let Some(spec) = self.tables.get_mut(&table) {
                spec.column_types.insert(column, udt);
            }
        }
    }

    /// Load column types for every whitelisted table in the current schema.
    pub async fn discover_column_types(&mut self, db: &dyn Executor) -> Result<(), ConfigError> {
        let q = QueryBuf::raw(
            "SELECT table_name::text AS table_name, column_name::text AS column_name, udt_name::text AS udt_name \
             FROM information_schema.columns WHERE table_schema = current_schema()",
            vec![],
        );
        let rows = db
            .fetch_all(&q)
            .await
            .map_err(|e| ConfigError::Discovery(e.to_string()))?;
        let triples = rows.into_iter().filter_map(|r| {
            let t = r.get("table_name")?.as_str()?.to_string();
            let c = r.get("column_name")?.as_str()?.to_string();
            let u = r.get("udt_name")?.as_str()?.to_string();
            Some((t, c, u))
        });
        self.record_column_types(triples);
        for spec in self.tables.values() {
            if spec.column_types.is_empty() {
                tracing::warn!(table = %spec.name, "no columns discovered; values bind untyped");
            }
        }
        tracing::info!(tables = self.tables.len(), "column types discovered");
        Ok(())
    }
}
