//! Schema bootstrap and setup checks.
//!
//! Content tables use BIGSERIAL keys; admin accounts and sessions use UUIDs. JSON-ish
//! columns (`gallery_images`, `navigation_links`, ...) are TEXT holding serialized JSON.

use crate::db::Executor;
use crate::error::{AppError, DbError};
use crate::sql::QueryBuf;
use serde::Serialize;
use serde_json::Value;
use sqlx::ConnectOptions;
use std::str::FromStr;

const TABLE_DDL: &[(&str, &str)] = &[
    (
        "admin_users",
        r#"CREATE TABLE IF NOT EXISTS admin_users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            full_name TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    ),
    (
        "sessions",
        r#"CREATE TABLE IF NOT EXISTS sessions (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES admin_users(id) ON DELETE CASCADE,
            token TEXT NOT NULL UNIQUE,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    ),
    (
        "services",
        r#"CREATE TABLE IF NOT EXISTS services (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            image_url TEXT,
            detail_image_url TEXT,
            detail_content TEXT,
            experience_years INTEGER,
            experience_description TEXT,
            benefits TEXT,
            features TEXT,
            gallery_images TEXT,
            icon_name TEXT,
            order_index INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    ),
    (
        "features",
        r#"CREATE TABLE IF NOT EXISTS features (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            icon_name TEXT,
            order_index INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    ),
    (
        "categories",
        r#"CREATE TABLE IF NOT EXISTS categories (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            icon_name TEXT,
            image_url TEXT,
            order_index INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    ),
    (
        "hero_sections",
        r#"CREATE TABLE IF NOT EXISTS hero_sections (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            title_highlight TEXT,
            description TEXT NOT NULL DEFAULT '',
            primary_button_text TEXT,
            primary_button_link TEXT,
            secondary_button_text TEXT,
            secondary_button_link TEXT,
            background_image_url TEXT,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            order_index INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    ),
    (
        "news",
        r#"CREATE TABLE IF NOT EXISTS news (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            image_url TEXT,
            category TEXT,
            is_featured BOOLEAN NOT NULL DEFAULT FALSE,
            published_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    ),
    (
        "contact_requests",
        r#"CREATE TABLE IF NOT EXISTS contact_requests (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            message TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'new',
            is_read BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    ),
    (
        "site_settings",
        r#"CREATE TABLE IF NOT EXISTS site_settings (
            id BIGSERIAL PRIMARY KEY,
            setting_key TEXT NOT NULL UNIQUE,
            setting_value TEXT,
            setting_type TEXT NOT NULL DEFAULT 'text',
            description TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    ),
    (
        "logos",
        r#"CREATE TABLE IF NOT EXISTS logos (
            id BIGSERIAL PRIMARY KEY,
            logo_type TEXT NOT NULL,
            image_url TEXT NOT NULL,
            alt_text TEXT,
            width INTEGER,
            height INTEGER,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    ),
    (
        "header_settings",
        r#"CREATE TABLE IF NOT EXISTS header_settings (
            id BIGSERIAL PRIMARY KEY,
            site_name TEXT NOT NULL DEFAULT '',
            site_tagline TEXT,
            phone_number TEXT,
            cta_button_text TEXT,
            cta_button_link TEXT,
            navigation_links TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    ),
    (
        "footer_settings",
        r#"CREATE TABLE IF NOT EXISTS footer_settings (
            id BIGSERIAL PRIMARY KEY,
            description TEXT,
            phone_number TEXT,
            email TEXT,
            address TEXT,
            quick_links TEXT,
            copyright_text TEXT,
            legal_links TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    ),
];

/// Tables the running system depends on, in creation order.
pub fn required_tables() -> impl Iterator<Item = &'static str> {
    TABLE_DDL.iter().map(|(name, _)| *name)
}

/// Create every table the endpoint, shims and auth routes use. Idempotent.
pub async fn ensure_tables(db: &dyn Executor) -> Result<(), DbError> {
    for (name, ddl) in TABLE_DDL {
        db.execute(&QueryBuf::raw(*ddl, vec![])).await?;
        tracing::debug!(table = %name, "table ensured");
    }
    db.execute(&QueryBuf::raw(
        "CREATE INDEX IF NOT EXISTS sessions_expires_at_idx ON sessions (expires_at)",
        vec![],
    ))
    .await?;
    tracing::info!(tables = TABLE_DDL.len(), "schema ready");
    Ok(())
}

/// Connects to the server's `postgres` database and creates the target database if missing.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = split_database_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::Internal(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(bootstrap_error)?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await
        .map_err(bootstrap_error)?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await
            .map_err(bootstrap_error)?;
        tracing::info!(database = %db_name, "database created");
    }
    Ok(())
}

fn bootstrap_error(e: sqlx::Error) -> AppError {
    AppError::Db(DbError {
        message: e.to_string(),
        code: e.as_database_error().and_then(|d| d.code()).map(|c| c.into_owned()),
        sql: String::new(),
        params: Vec::new(),
    })
}

/// Returns `(url of the postgres maintenance db, target db name)`.
fn split_database_url(url: &str) -> Result<(String, String), AppError> {
    let authority_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = url
        .get(authority_end..)
        .and_then(|rest| rest.find('/'))
        .map(|i| authority_end + i + 1)
        .ok_or_else(|| AppError::Internal("DATABASE_URL has no database path".into()))?;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let (db_name, query) = match path_and_query.split_once('?') {
        Some((name, q)) => (name.trim(), Some(q)),
        None => (path_and_query.trim(), None),
    };
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = match query {
        Some(q) => format!("{}postgres?{}", base, q),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Outcome of `check_setup`, printed by `cms-admin check-setup`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SetupReport {
    pub database_reachable: bool,
    pub missing_tables: Vec<String>,
    pub admin_count: i64,
    pub admin_emails: Vec<String>,
}

impl SetupReport {
    pub fn is_ready(&self) -> bool {
        self.database_reachable && self.missing_tables.is_empty() && self.admin_count > 0
    }
}

/// Connectivity, tables and admin accounts. Stops early when the database is unreachable.
pub async fn check_setup(db: &dyn Executor) -> Result<SetupReport, AppError> {
    let mut report = SetupReport::default();
    if let Err(e) = db.ping().await {
        tracing::warn!(error = %e.message, "database unreachable");
        return Ok(report);
    }
    report.database_reachable = true;

    let rows = db
        .fetch_all(&QueryBuf::raw(
            "SELECT table_name::text AS table_name FROM information_schema.tables WHERE table_schema = current_schema()",
            vec![],
        ))
        .await?;
    let present: Vec<&str> = rows
        .iter()
        .filter_map(|r| r.get("table_name").and_then(Value::as_str))
        .collect();
    report.missing_tables = required_tables()
        .filter(|t| !present.contains(t))
        .map(str::to_string)
        .collect();
    if report.missing_tables.iter().any(|t| t == "admin_users") {
        return Ok(report);
    }

    report.admin_count = crate::auth::count_admins(db).await?;
    let admins = db
        .fetch_all(&QueryBuf::raw(
            "SELECT email FROM admin_users ORDER BY created_at LIMIT 5",
            vec![],
        ))
        .await?;
    report.admin_emails = admins
        .iter()
        .filter_map(|r| r.get("email").and_then(Value::as_str).map(str::to_string))
        .collect();
    Ok(report)
}
