//! Fluent builders over a `Backend`. Each builder is consumed by its terminal call.

use super::envelope::{ClientError, Envelope};
use crate::query::{Filter, FilterOp, OrderBy, Predicate, SelectQuery};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Where built queries run: over HTTP or in-process.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn select(&self, query: SelectQuery) -> Result<Vec<Value>, ClientError>;

    async fn select_single(&self, query: SelectQuery) -> Result<Option<Value>, ClientError>;

    /// Returns the stored row as the backend reports it.
    async fn insert(&self, table: &str, row: Value) -> Result<Value, ClientError>;

    async fn update(&self, table: &str, patch: Value, predicate: Predicate) -> Result<Value, ClientError>;

    async fn delete(&self, table: &str, predicate: Predicate) -> Result<(), ClientError>;
}

pub struct TableRef<'a> {
    backend: &'a dyn Backend,
    table: String,
}

impl<'a> TableRef<'a> {
    pub fn new(backend: &'a dyn Backend, table: impl Into<String>) -> Self {
        TableRef {
            backend,
            table: table.into(),
        }
    }

    /// `columns` is `*` or a comma-separated list.
    pub fn select(self, columns: &str) -> SelectBuilder<'a> {
        let mut query = SelectQuery::new(self.table);
        query.columns = columns.to_string();
        SelectBuilder {
            backend: self.backend,
            query,
        }
    }

    pub fn insert<T: Serialize>(self, row: T) -> InsertBuilder<'a> {
        InsertBuilder {
            backend: self.backend,
            table: self.table,
            row: to_json(row),
        }
    }

    pub fn update<T: Serialize>(self, patch: T) -> UpdateBuilder<'a> {
        UpdateBuilder {
            backend: self.backend,
            table: self.table,
            patch: to_json(patch),
        }
    }

    pub fn delete(self) -> DeleteBuilder<'a> {
        DeleteBuilder {
            backend: self.backend,
            table: self.table,
        }
    }
}

fn to_json<T: Serialize>(v: T) -> Result<Value, ClientError> {
    serde_json::to_value(v).map_err(|e| ClientError::Rejected(format!("row is not serializable: {}", e)))
}

pub struct SelectBuilder<'a> {
    backend: &'a dyn Backend,
    query: SelectQuery,
}

impl<'a> SelectBuilder<'a> {
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.query.filters.push(Filter {
            column: column.to_string(),
            op: FilterOp::Eq(value.into()),
        });
        self
    }

    /// Matches any of `values`; an empty list matches nothing.
    pub fn in_<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.query.filters.push(Filter {
            column: column.to_string(),
            op: FilterOp::In(values.into_iter().map(Into::into).collect()),
        });
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.query.order = Some(OrderBy::new(column, ascending));
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.query.limit = Some(n);
        self
    }

    pub fn descriptor(&self) -> &SelectQuery {
        &self.query
    }

    pub async fn fetch(self) -> Envelope<Vec<Value>> {
        Envelope::from_result(self.backend.select(self.query).await)
    }

    /// First row, or `data: null` when nothing matches.
    pub async fn single(mut self) -> Envelope<Value> {
        self.query.single = true;
        Envelope::from_optional(self.backend.select_single(self.query).await)
    }
}

pub struct InsertBuilder<'a> {
    backend: &'a dyn Backend,
    table: String,
    row: Result<Value, ClientError>,
}

impl InsertBuilder<'_> {
    pub async fn execute(self) -> Envelope<Value> {
        let r = match self.row {
            Ok(row) => self.backend.insert(&self.table, row).await,
            Err(e) => Err(e),
        };
        Envelope::from_result(r)
    }
}

/// Needs `.eq(column, value)` before it can run.
pub struct UpdateBuilder<'a> {
    backend: &'a dyn Backend,
    table: String,
    patch: Result<Value, ClientError>,
}

impl<'a> UpdateBuilder<'a> {
    pub fn eq(self, column: &str, value: impl Into<Value>) -> ScopedUpdate<'a> {
        ScopedUpdate {
            backend: self.backend,
            table: self.table,
            patch: self.patch,
            predicate: Predicate::new(column, value.into()).map_err(ClientError::from),
        }
    }
}

pub struct ScopedUpdate<'a> {
    backend: &'a dyn Backend,
    table: String,
    patch: Result<Value, ClientError>,
    predicate: Result<Predicate, ClientError>,
}

impl ScopedUpdate<'_> {
    pub async fn execute(self) -> Envelope<Value> {
        let r = match (self.patch, self.predicate) {
            (Ok(patch), Ok(predicate)) => self.backend.update(&self.table, patch, predicate).await,
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        Envelope::from_result(r)
    }
}

/// Needs `.eq(column, value)` before it can run.
pub struct DeleteBuilder<'a> {
    backend: &'a dyn Backend,
    table: String,
}

impl<'a> DeleteBuilder<'a> {
    pub fn eq(self, column: &str, value: impl Into<Value>) -> ScopedDelete<'a> {
        ScopedDelete {
            backend: self.backend,
            table: self.table,
            predicate: Predicate::new(column, value.into()).map_err(ClientError::from),
        }
    }
}

pub struct ScopedDelete<'a> {
    backend: &'a dyn Backend,
    table: String,
    predicate: Result<Predicate, ClientError>,
}

impl ScopedDelete<'_> {
    /// `data` is always null.
    pub async fn execute(self) -> Envelope<Value> {
        let r = match self.predicate {
            Ok(predicate) => self.backend.delete(&self.table, predicate).await,
            Err(e) => Err(e),
        };
        match r {
            Ok(()) => Envelope::empty(),
            Err(e) => Envelope::err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        selects: Mutex<Vec<SelectQuery>>,
        writes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Backend for Recorder {
        async fn select(&self, query: SelectQuery) -> Result<Vec<Value>, ClientError> {
            self.selects.lock().unwrap().push(query);
            Ok(vec![json!({"id": 1})])
        }

        async fn select_single(&self, query: SelectQuery) -> Result<Option<Value>, ClientError> {
            self.selects.lock().unwrap().push(query);
            Ok(None)
        }

        async fn insert(&self, table: &str, row: Value) -> Result<Value, ClientError> {
            self.writes.lock().unwrap().push(format!("insert {} {}", table, row));
            Ok(row)
        }

        async fn update(&self, table: &str, patch: Value, predicate: Predicate) -> Result<Value, ClientError> {
            self.writes
                .lock()
                .unwrap()
                .push(format!("update {} {} {}", table, predicate.column(), predicate.value()));
            Ok(patch)
        }

        async fn delete(&self, table: &str, predicate: Predicate) -> Result<(), ClientError> {
            self.writes
                .lock()
                .unwrap()
                .push(format!("delete {} {}", table, predicate.column()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn chain_builds_descriptor_in_call_order() {
        let r = Recorder::default();
        let env = TableRef::new(&r, "news")
            .select("id,title")
            .eq("is_featured", true)
            .in_("category", ["a", "b"])
            .order("published_at", false)
            .limit(5)
            .fetch()
            .await;
        assert_eq!(env.data, Some(vec![json!({"id": 1})]));
        let q = r.selects.lock().unwrap()[0].clone();
        assert_eq!(q.table, "news");
        assert_eq!(q.columns, "id,title");
        assert_eq!(q.filters[0].op, FilterOp::Eq(json!(true)));
        assert_eq!(q.filters[1].op, FilterOp::In(vec![json!("a"), json!("b")]));
        assert_eq!(q.order, Some(OrderBy::new("published_at", false)));
        assert_eq!(q.limit, Some(5));
        assert!(!q.single);
    }

    #[tokio::test]
    async fn single_with_no_match_is_null_without_error() {
        let r = Recorder::default();
        let env = TableRef::new(&r, "services").select("*").eq("id", 99).single().await;
        assert_eq!(env, Envelope::empty());
        assert!(r.selects.lock().unwrap()[0].single);
    }

    #[tokio::test]
    async fn bad_predicate_never_reaches_backend() {
        let r = Recorder::default();
        let env = TableRef::new(&r, "news").delete().eq("--", 1).execute().await;
        assert_eq!(env.error.unwrap().message, "Invalid column name");
        let env = TableRef::new(&r, "news").update(json!({"title": "x"})).eq("id", "").execute().await;
        assert_eq!(env.error.unwrap().message, "Missing where clause");
        assert!(r.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_are_scoped_to_one_predicate() {
        let r = Recorder::default();
        let env = TableRef::new(&r, "news").update(json!({"title": "x"})).eq("id", 7).execute().await;
        assert_eq!(env.data, Some(json!({"title": "x"})));
        let env = TableRef::new(&r, "news").delete().eq("id", 7).execute().await;
        assert_eq!(env, Envelope::empty());
        assert_eq!(
            *r.writes.lock().unwrap(),
            vec!["update news id 7".to_string(), "delete news id".to_string()]
        );
    }
}
