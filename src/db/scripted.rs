//! In-memory `Executor` that records every statement and answers from a closure.

use super::Executor;
use crate::error::DbError;
use crate::sql::QueryBuf;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

type Responder = dyn Fn(&QueryBuf) -> Result<Vec<Value>, DbError> + Send + Sync;

pub struct ScriptedExecutor {
    calls: Mutex<Vec<QueryBuf>>,
    responder: Box<Responder>,
}

impl ScriptedExecutor {
    pub fn new(responder: impl Fn(&QueryBuf) -> Result<Vec<Value>, DbError> + Send + Sync + 'static) -> Self {
        ScriptedExecutor {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    /// Every statement returns no rows.
    pub fn empty() -> Self {
        Self::new(|_| Ok(Vec::new()))
    }

    pub fn calls(&self) -> Vec<QueryBuf> {
        self.lock().clone()
    }

    pub fn sql_log(&self) -> Vec<String> {
        self.lock().iter().map(|q| q.sql.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<QueryBuf>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn answer(&self, q: &QueryBuf) -> Result<Vec<Value>, DbError> {
        self.lock().push(q.clone());
        (self.responder)(q)
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, DbError> {
        self.answer(q)
    }

    /// Rows affected is the number of rows the responder returns.
    async fn execute(&self, q: &QueryBuf) -> Result<u64, DbError> {
        self.answer(q).map(|rows| rows.len() as u64)
    }
}
