//! Generic table operations against the executor.

use super::validation::RowValidator;
use crate::auth::{self, SessionUser};
use crate::config::TableSpec;
use crate::db::Executor;
use crate::error::AppError;
use crate::query::{Predicate, SelectQuery};
use crate::sql::{delete, insert, select, update};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

pub struct TableService;

impl TableService {
    /// Whether `op` on `table` needs an admin caller.
    pub fn requires_admin(table: &TableSpec, op: Operation) -> bool {
        match op {
            Operation::Read => table.access.admin_read,
            Operation::Create | Operation::Update | Operation::Delete => true,
        }
    }

    /// Locked tables refuse generic writes before anyone is asked who they are.
    pub fn check_writable(table: &TableSpec, op: Operation) -> Result<(), AppError> {
        if matches!(op, Operation::Update | Operation::Delete) && table.access.locked_writes {
            tracing::warn!(table = %table.name(), op = ?op, "write refused on locked table");
            return Err(AppError::Forbidden("Operation not permitted on this table".into()));
        }
        Ok(())
    }

    /// Full check for a caller already resolved to a session user.
    pub async fn authorize(
        db: &dyn Executor,
        table: &TableSpec,
        op: Operation,
        user: Option<&SessionUser>,
    ) -> Result<(), AppError> {
        Self::check_writable(table, op)?;
        if !Self::requires_admin(table, op) {
            return Ok(());
        }
        let user = user.ok_or(AppError::Unauthorized)?;
        if !auth::is_admin(db, &user.id).await? {
            tracing::info!(user_id = %user.id, table = %table.name(), op = ?op, "non-admin write attempt");
            return Err(AppError::Unauthorized);
        }
        Ok(())
    }

    /// Rows matching the query, sensitive columns removed.
    pub async fn list(db: &dyn Executor, table: &TableSpec, query: &SelectQuery) -> Result<Vec<Value>, AppError> {
        let q = select(table, query);
        let mut rows = db.fetch_all(&q).await?;
        for row in rows.iter_mut() {
            table.strip_sensitive(row);
        }
        Ok(rows)
    }

    /// First matching row or None.
    pub async fn first(db: &dyn Executor, table: &TableSpec, query: &SelectQuery) -> Result<Option<Value>, AppError> {
        let mut query = query.clone();
        query.single = true;
        Ok(Self::list(db, table, &query).await?.into_iter().next())
    }

    /// Insert one row; returns `{ id, ...submitted }` with the generated key.
    pub async fn create(db: &dyn Executor, table: &TableSpec, body: &Value) -> Result<Value, AppError> {
        let row = RowValidator::columns(body)?;
        let q = insert(table, &row);
        let returned = db
            .fetch_optional(&q)
            .await?
            .ok_or_else(|| AppError::Internal("insert returned no row".into()))?;
        let id = returned.get(table.primary_key()).cloned().unwrap_or(Value::Null);

        let mut merged = Map::new();
        merged.insert(table.primary_key().to_string(), id);
        merged.extend(row);
        let mut merged = Value::Object(merged);
        table.strip_sensitive(&mut merged);
        tracing::debug!(table = %table.name(), "row created");
        Ok(merged)
    }

    /// Returns rows affected.
    pub async fn update(
        db: &dyn Executor,
        table: &TableSpec,
        predicate: &Predicate,
        patch: &Value,
    ) -> Result<u64, AppError> {
        let patch = RowValidator::columns(patch)?;
        let q = update(table, &patch, predicate);
        let n = db.execute(&q).await?;
        tracing::debug!(table = %table.name(), rows = n, "rows updated");
        Ok(n)
    }

    /// Returns rows affected.
    pub async fn delete(db: &dyn Executor, table: &TableSpec, predicate: &Predicate) -> Result<u64, AppError> {
        let q = delete(table, predicate);
        let n = db.execute(&q).await?;
        tracing::debug!(table = %table.name(), rows = n, "rows deleted");
        Ok(n)
    }
}
