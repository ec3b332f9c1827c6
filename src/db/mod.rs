//! Raw SQL execution: the `Executor` seam and its PostgreSQL implementation.

use crate::config::Settings;
use crate::error::DbError;
use crate::sql::{PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};
use std::sync::RwLock;

mod scripted;
pub use scripted::ScriptedExecutor;

/// Runs built statements. Rows come back as JSON objects keyed by column name.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, DbError>;

    /// Rows affected.
    async fn execute(&self, q: &QueryBuf) -> Result<u64, DbError>;

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Value>, DbError> {
        Ok(self.fetch_all(q).await?.into_iter().next())
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.fetch_all(&QueryBuf::raw("SELECT 1 AS ok", vec![])).await.map(|_| ())
    }
}

/// Pool settings kept so `reset` can rebuild an identical pool.
#[derive(Clone, Debug)]
struct PoolConfig {
    url: String,
    max_connections: u32,
}

/// Executor over one explicitly constructed `PgPool`.
pub struct PgExecutor {
    pool: RwLock<PgPool>,
    config: PoolConfig,
}

impl PgExecutor {
    pub async fn connect(settings: &Settings) -> Result<Self, DbError> {
        let config = PoolConfig {
            url: settings.database_url.clone(),
            max_connections: settings.max_connections,
        };
        let pool = open_pool(&config).await?;
        tracing::info!(max_connections = config.max_connections, "database pool ready");
        Ok(PgExecutor {
            pool: RwLock::new(pool),
            config,
        })
    }

    /// Wrap an existing pool (tests, embedding).
    pub fn from_pool(pool: PgPool, url: impl Into<String>, max_connections: u32) -> Self {
        PgExecutor {
            pool: RwLock::new(pool),
            config: PoolConfig {
                url: url.into(),
                max_connections,
            },
        }
    }

    /// A cheap handle to the current pool; the lock is never held across an await.
    pub fn pool(&self) -> PgPool {
        match self.pool.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Close the current pool and open a fresh one with the same settings.
    pub async fn reset(&self) -> Result<(), DbError> {
        let fresh = open_pool(&self.config).await?;
        let old = {
            let mut guard = match self.pool.write() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::replace(&mut *guard, fresh)
        };
        old.close().await;
        tracing::info!("database pool reset");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool().close().await;
        tracing::info!("database pool closed");
    }
}

async fn open_pool(config: &PoolConfig) -> Result<PgPool, DbError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .map_err(|e| DbError {
            message: e.to_string(),
            code: None,
            sql: String::new(),
            params: Vec::new(),
        })
}

fn bind_all<'q>(
    q: &'q QueryBuf,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

fn to_db_error(e: sqlx::Error, q: &QueryBuf) -> DbError {
    let code = e.as_database_error().and_then(|d| d.code()).map(|c| c.into_owned());
    let message = match e.as_database_error() {
        Some(d) => d.message().to_string(),
        None => e.to_string(),
    };
    tracing::error!(error = %message, code = ?code, sql = %q.sql, params = ?q.params, "query failed");
    DbError {
        message,
        code,
        sql: q.sql.clone(),
        params: q.params.clone(),
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, DbError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let pool = self.pool();
        let rows = bind_all(q).fetch_all(&pool).await.map_err(|e| to_db_error(e, q))?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, DbError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let pool = self.pool();
        let done = bind_all(q).execute(&pool).await.map_err(|e| to_db_error(e, q))?;
        Ok(done.rows_affected())
    }
}

pub fn row_to_json(row: &PgRow) -> Value {
    let mut map = Map::new();
    for (i, col) in row.columns().iter().enumerate() {
        map.insert(col.name().to_string(), cell_to_value(row, i, col.type_info().name()));
    }
    Value::Object(map)
}

/// Decode by the column's declared type; anything unrecognized is tried as text.
/// Types with no text decoding (NUMERIC, arrays) come back as null with a warning.
fn cell_to_value(row: &PgRow, i: usize, type_name: &str) -> Value {
    fn opt<T>(r: Result<Option<T>, sqlx::Error>, f: impl FnOnce(T) -> Value) -> Value {
        match r {
            Ok(v) => v.map(f).unwrap_or(Value::Null),
            Err(e) => {
                tracing::warn!(error = %e, "column decode failed; returned as null");
                Value::Null
            }
        }
    }
    match type_name {
        "INT2" => opt(row.try_get::<Option<i16>, _>(i), |n| Value::from(n)),
        "INT4" => opt(row.try_get::<Option<i32>, _>(i), |n| Value::from(n)),
        "INT8" => opt(row.try_get::<Option<i64>, _>(i), |n| Value::from(n)),
        "FLOAT4" => opt(row.try_get::<Option<f32>, _>(i), |n| Value::from(n as f64)),
        "FLOAT8" => opt(row.try_get::<Option<f64>, _>(i), Value::from),
        "BOOL" => opt(row.try_get::<Option<bool>, _>(i), Value::Bool),
        "UUID" => opt(row.try_get::<Option<uuid::Uuid>, _>(i), |u| Value::String(u.to_string())),
        "TIMESTAMPTZ" => opt(row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i), |d| {
            Value::String(d.to_rfc3339())
        }),
        "TIMESTAMP" => opt(row.try_get::<Option<chrono::NaiveDateTime>, _>(i), |d| {
            Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }),
        "DATE" => opt(row.try_get::<Option<chrono::NaiveDate>, _>(i), |d| {
            Value::String(d.format("%Y-%m-%d").to_string())
        }),
        "JSON" | "JSONB" => opt(row.try_get::<Option<Value>, _>(i), |j| j),
        _ => match row.try_get::<Option<String>, _>(i) {
            Ok(v) => v.map(Value::String).unwrap_or(Value::Null),
            Err(e) => {
                tracing::warn!(column = i, pg_type = %type_name, error = %e, "undecodable column returned as null");
                Value::Null
            }
        },
    }
}
