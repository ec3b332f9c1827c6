//! Shared application state for all routes. Built once at startup and injected everywhere.

use crate::config::{Settings, TableRegistry};
use crate::db::Executor;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Executor>,
    /// Fixed after column discovery at startup.
    pub tables: Arc<TableRegistry>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db: Arc<dyn Executor>, tables: TableRegistry, settings: Settings) -> Self {
        AppState {
            db,
            tables: Arc::new(tables),
            settings: Arc::new(settings),
        }
    }
}
