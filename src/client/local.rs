//! In-process shim for server-side rendering. Runs through `TableService`, no HTTP.

use super::builder::{Backend, TableRef};
use super::envelope::ClientError;
use super::json_fields::unstringify;
use crate::auth::{self, SessionUser};
use crate::config::{JsonFieldMode, TableRegistry, TableSpec};
use crate::db::Executor;
use crate::error::AppError;
use crate::query::{Predicate, SelectQuery};
use crate::service::{Operation, TableService};
use crate::state::AppState;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct LocalClient {
    db: Arc<dyn Executor>,
    tables: Arc<TableRegistry>,
    user: Option<SessionUser>,
    json_mode: JsonFieldMode,
}

impl LocalClient {
    /// Anonymous client; reads work, writes are refused.
    pub fn new(state: &AppState) -> Self {
        LocalClient {
            db: state.db.clone(),
            tables: state.tables.clone(),
            user: None,
            json_mode: state.settings.json_field_mode,
        }
    }

    /// Client acting for whoever holds `token`.
    pub async fn for_session(state: &AppState, token: Option<&str>) -> Result<Self, AppError> {
        let user = match token {
            Some(t) => auth::find_session(state.db.as_ref(), t).await?,
            None => None,
        };
        Ok(Self::new(state).with_user(user))
    }

    pub fn with_user(mut self, user: Option<SessionUser>) -> Self {
        self.user = user;
        self
    }

    pub fn with_json_mode(mut self, mode: JsonFieldMode) -> Self {
        self.json_mode = mode;
        self
    }

    pub fn current_user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn from(&self, table: &str) -> TableRef<'_> {
        TableRef::new(self, table)
    }

    fn spec(&self, table: &str) -> Result<&TableSpec, ClientError> {
        Ok(self.tables.resolve(table)?)
    }

    /// Every write asks the database again whether the caller is an admin.
    async fn check_admin(&self, table: &TableSpec, op: Operation) -> Result<(), ClientError> {
        TableService::check_writable(table, op)?;
        let user = self.user.as_ref().ok_or(AppError::Unauthorized)?;
        if !auth::is_admin(self.db.as_ref(), &user.id).await? {
            return Err(AppError::Unauthorized.into());
        }
        Ok(())
    }

    fn finish(&self, table: &TableSpec, mut row: Value) -> Value {
        unstringify(&mut row, table, self.json_mode);
        row
    }
}

#[async_trait]
impl Backend for LocalClient {
    async fn select(&self, query: SelectQuery) -> Result<Vec<Value>, ClientError> {
        let spec = self.spec(&query.table)?;
        let rows = TableService::list(self.db.as_ref(), spec, &query).await?;
        Ok(rows.into_iter().map(|r| self.finish(spec, r)).collect())
    }

    async fn select_single(&self, query: SelectQuery) -> Result<Option<Value>, ClientError> {
        let spec = self.spec(&query.table)?;
        let row = TableService::first(self.db.as_ref(), spec, &query).await?;
        Ok(row.map(|r| self.finish(spec, r)))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, ClientError> {
        let spec = self.spec(table)?;
        self.check_admin(spec, Operation::Create).await?;
        Ok(TableService::create(self.db.as_ref(), spec, &row).await?)
    }

    /// Returns the patch as submitted.
    async fn update(&self, table: &str, patch: Value, predicate: Predicate) -> Result<Value, ClientError> {
        let spec = self.spec(table)?;
        self.check_admin(spec, Operation::Update).await?;
        TableService::update(self.db.as_ref(), spec, &predicate, &patch).await?;
        Ok(patch)
    }

    async fn delete(&self, table: &str, predicate: Predicate) -> Result<(), ClientError> {
        let spec = self.spec(table)?;
        self.check_admin(spec, Operation::Delete).await?;
        TableService::delete(self.db.as_ref(), spec, &predicate).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::db::ScriptedExecutor;
    use crate::sql::QueryBuf;
    use serde_json::json;

    fn state_with(db: ScriptedExecutor) -> (AppState, Arc<ScriptedExecutor>) {
        let db = Arc::new(db);
        let settings = Settings::from_lookup(|k| (k == "DATABASE_URL").then(|| "postgres://test".to_string())).unwrap();
        (AppState::new(db.clone(), TableRegistry::builtin(), settings), db)
    }

    fn admin_aware(q: &QueryBuf) -> Result<Vec<Value>, crate::error::DbError> {
        if q.sql.contains("FROM admin_users") {
            let id = q.params.first().and_then(Value::as_str).unwrap_or_default();
            return Ok(if id == "admin-1" {
                vec![json!({"id": "admin-1", "email": "a@x.io", "full_name": null})]
            } else {
                vec![]
            });
        }
        if q.sql.starts_with("INSERT") {
            return Ok(vec![json!({"id": 12})]);
        }
        Ok(vec![json!({"id": 1, "navigation_links": "[{\"label\":\"Home\"}]"})])
    }

    fn admin() -> Option<SessionUser> {
        Some(SessionUser {
            id: "admin-1".into(),
            session_token: "tok".into(),
        })
    }

    #[tokio::test]
    async fn reads_unstringify_declared_columns() {
        let (state, _) = state_with(ScriptedExecutor::new(admin_aware));
        let env = LocalClient::new(&state).from("header_settings").select("*").single().await;
        assert_eq!(env.data.unwrap()["navigation_links"], json!([{"label": "Home"}]));
    }

    #[tokio::test]
    async fn anonymous_writes_are_unauthorized_before_any_sql() {
        let (state, db) = state_with(ScriptedExecutor::new(admin_aware));
        let env = LocalClient::new(&state).from("news").insert(json!({"title": "x"})).execute().await;
        assert_eq!(env.error.unwrap().message, "Unauthorized");
        assert!(db.calls().is_empty());
    }

    #[tokio::test]
    async fn non_admin_session_cannot_write() {
        let (state, db) = state_with(ScriptedExecutor::new(admin_aware));
        let client = LocalClient::new(&state).with_user(Some(SessionUser {
            id: "someone".into(),
            session_token: "t".into(),
        }));
        let env = client.from("news").delete().eq("id", 3).execute().await;
        assert_eq!(env.error.unwrap().message, "Unauthorized");
        assert!(db.sql_log().iter().all(|s| !s.starts_with("DELETE")));
    }

    #[tokio::test]
    async fn admin_writes_recheck_membership_each_time() {
        let (state, db) = state_with(ScriptedExecutor::new(admin_aware));
        let client = LocalClient::new(&state).with_user(admin());
        let env = client.from("news").insert(json!({"title": "Hello"})).execute().await;
        assert_eq!(env.data, Some(json!({"id": 12, "title": "Hello"})));
        let env = client.from("news").update(json!({"title": "Bye"})).eq("id", 12).execute().await;
        assert_eq!(env.data, Some(json!({"title": "Bye"})));
        let admin_checks = db.sql_log().iter().filter(|s| s.contains("FROM admin_users")).count();
        assert_eq!(admin_checks, 2);
    }

    #[tokio::test]
    async fn whitelist_applies_in_process() {
        let (state, db) = state_with(ScriptedExecutor::new(admin_aware));
        let env = LocalClient::new(&state).from("sessions").select("*").fetch().await;
        assert_eq!(env.error.unwrap().message, "Table not allowed");
        assert!(db.calls().is_empty());
    }
}
