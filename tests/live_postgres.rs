//! Scenarios against a real PostgreSQL. Skipped unless `TEST_DATABASE_URL` is set.

use cms_core::auth::{create_admin, sign_in};
use cms_core::client::LocalClient;
use cms_core::{ensure_tables, AppState, Executor, PgExecutor, Settings, TableRegistry};
use serde_json::{json, Value};
use std::sync::Arc;

async fn live_state() -> Option<AppState> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let settings = Settings::from_lookup(|k| match k {
        "DATABASE_URL" => Some(url.clone()),
        "DB_MAX_CONNECTIONS" => Some("4".to_string()),
        _ => None,
    })
    .unwrap();
    let db = Arc::new(PgExecutor::connect(&settings).await.unwrap());
    ensure_tables(db.as_ref()).await.unwrap();
    let mut tables = TableRegistry::builtin();
    tables.discover_column_types(db.as_ref()).await.unwrap();
    let executor: Arc<dyn Executor> = db;
    Some(AppState::new(executor, tables, settings))
}

async fn signed_in_admin(state: &AppState) -> LocalClient {
    let email = format!("admin-{}@test.io", uuid::Uuid::new_v4().simple());
    create_admin(state.db.as_ref(), &email, "s3cret-pass", Some("Live Admin"))
        .await
        .unwrap();
    let signed = sign_in(state.db.as_ref(), &email, "s3cret-pass", 1).await.unwrap();
    LocalClient::for_session(state, Some(&signed.token)).await.unwrap()
}

#[tokio::test]
async fn news_lifecycle_through_the_local_shim() {
    let Some(state) = live_state().await else { return };
    let admin = signed_in_admin(&state).await;
    let marker = uuid::Uuid::new_v4().simple().to_string();

    let created = admin
        .from("news")
        .insert(json!({"title": marker, "content": "body", "is_featured": true}))
        .execute()
        .await;
    assert_eq!(created.error, None);
    let id = created.data.unwrap()["id"].clone();
    assert!(id.is_i64());

    let found = admin.from("news").select("*").eq("title", marker.as_str()).single().await;
    let row = found.data.unwrap();
    assert_eq!(row["is_featured"], Value::Bool(true));

    let edited = admin
        .from("news")
        .update(json!({"content": "edited"}))
        .eq("id", id.clone())
        .execute()
        .await;
    assert_eq!(edited.error, None);
    let row = admin.from("news").select("content").eq("id", id.clone()).single().await;
    assert_eq!(row.data.unwrap()["content"], "edited");

    let gone = admin.from("news").delete().eq("id", id.clone()).execute().await;
    assert_eq!(gone.error, None);
    let row = admin.from("news").select("*").eq("id", id).single().await;
    assert_eq!(row.data, None);
    assert_eq!(row.error, None);
}

#[tokio::test]
async fn json_text_columns_come_back_structured() {
    let Some(state) = live_state().await else { return };
    let admin = signed_in_admin(&state).await;
    let links = json!([{"label": "Home", "href": "/"}]);

    let created = admin
        .from("header_settings")
        .insert(json!({"site_name": "Live", "navigation_links": links.to_string()}))
        .execute()
        .await;
    let id = created.data.unwrap()["id"].clone();

    let row = admin.from("header_settings").select("*").eq("id", id.clone()).single().await;
    assert_eq!(row.data.unwrap()["navigation_links"], links);
    admin.from("header_settings").delete().eq("id", id).execute().await;
}

#[tokio::test]
async fn anonymous_local_writes_are_refused() {
    let Some(state) = live_state().await else { return };
    let env = LocalClient::new(&state)
        .from("services")
        .insert(json!({"title": "nope"}))
        .execute()
        .await;
    assert_eq!(env.error.unwrap().message, "Unauthorized");
}

#[tokio::test]
async fn pool_reset_keeps_the_executor_usable() {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else { return };
    let settings = Settings::from_lookup(|k| (k == "DATABASE_URL").then(|| url.clone())).unwrap();
    let db = PgExecutor::connect(&settings).await.unwrap();
    db.ping().await.unwrap();
    db.reset().await.unwrap();
    db.ping().await.unwrap();
    db.close().await;
    assert!(db.ping().await.is_err());
}

#[tokio::test]
async fn endpoint_orders_services_descending_with_limit() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let Some(state) = live_state().await else { return };
    let admin = signed_in_admin(&state).await;
    let marker = uuid::Uuid::new_v4().simple().to_string();
    let mut ids = Vec::new();
    for order_index in 1..=3 {
        let created = admin
            .from("services")
            .insert(json!({"title": marker, "order_index": order_index}))
            .execute()
            .await;
        ids.push(created.data.unwrap()["id"].clone());
    }

    let uri = format!("/api/services?title={}&orderBy=order_index&ascending=false&limit=2", marker);
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = cms_core::app(state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let rows: Vec<Value> = serde_json::from_slice(&bytes).unwrap();
    let order: Vec<i64> = rows.iter().filter_map(|r| r["order_index"].as_i64()).collect();
    assert_eq!(order, vec![3, 2]);

    for id in ids {
        admin.from("services").delete().eq("id", id).execute().await;
    }
}

#[tokio::test]
async fn undecodable_columns_do_not_sink_the_row() {
    let Some(state) = live_state().await else { return };
    let q = cms_core::sql::QueryBuf::raw("SELECT 2.50::numeric AS price, 'kept'::text AS label", vec![]);
    let rows = state.db.fetch_all(&q).await.unwrap();
    assert_eq!(rows, vec![json!({"price": null, "label": "kept"})]);
}
