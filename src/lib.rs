//! CMS core: a whitelisted generic table endpoint over PostgreSQL, admin sessions, and
//! fluent query shims that run over HTTP or in-process.

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod pages;
pub mod query;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;

pub use client::{Envelope, LocalClient, RemoteClient};
pub use config::{Settings, TableRegistry};
pub use db::{Executor, PgExecutor};
pub use error::{AppError, ConfigError, DbError};
pub use routes::{app, auth_routes, common_routes, page_routes, table_routes};
pub use schema::{check_setup, ensure_database_exists, ensure_tables};
pub use state::AppState;
