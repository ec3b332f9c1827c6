//! CMS server: ensures the database and tables exist, discovers column types, then serves
//! the table endpoint, auth routes, page data and health routes.

use cms_core::{app, ensure_database_exists, ensure_tables, AppState, Executor, PgExecutor, Settings, TableRegistry};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cms_core=info".parse()?))
        .init();

    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let db = Arc::new(PgExecutor::connect(&settings).await?);
    ensure_tables(db.as_ref()).await?;

    let mut tables = TableRegistry::builtin();
    tables.discover_column_types(db.as_ref()).await?;

    let purged = cms_core::auth::purge_expired_sessions(db.as_ref()).await?;
    if purged > 0 {
        tracing::info!(sessions = purged, "expired sessions removed");
    }

    let bind_addr = settings.bind_addr.clone();
    let executor: Arc<dyn Executor> = db.clone();
    let state = AppState::new(executor, tables, settings);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    db.close().await;
    Ok(())
}
