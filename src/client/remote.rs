//! HTTP shim: builds query strings for `/api/:table` and reads JSON back.

use super::builder::{Backend, TableRef};
use super::envelope::{ClientError, Envelope};
use crate::auth::{session_token_from_set_cookie, SESSION_COOKIE_NAME};
use crate::query::{value_to_query_text, FilterOp, OrderBy, Predicate, SelectQuery};
use crate::sql::sanitized_non_empty;
use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::{json, Value};
use std::sync::RwLock;

const FALLBACK_ERROR: &str = "Request failed";

pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    session: RwLock<Option<String>>,
    /// Applied to `.fetch()` calls that set no order.
    default_order: Option<OrderBy>,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        RemoteClient {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: RwLock::new(None),
            default_order: Some(OrderBy::new("created_at", false)),
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Start with an existing session token (e.g. forwarded from an incoming request).
    pub fn with_session(self, token: impl Into<String>) -> Self {
        self.set_session(Some(token.into()));
        self
    }

    pub fn with_default_order(mut self, order: Option<OrderBy>) -> Self {
        self.default_order = order;
        self
    }

    pub fn session_token(&self) -> Option<String> {
        match self.session.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_session(&self, token: Option<String>) {
        let mut guard = match self.session.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = token;
    }

    pub fn from(&self, table: &str) -> TableRef<'_> {
        TableRef::new(self, table)
    }

    pub fn auth(&self) -> RemoteAuth<'_> {
        RemoteAuth { client: self }
    }

    fn table_url(&self, table: &str) -> Result<String, ClientError> {
        let table = sanitized_non_empty(table).ok_or_else(|| ClientError::Rejected("Invalid table name".into()))?;
        Ok(format!("{}/api/{}", self.base_url, table))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self.http.request(method, url);
        match self.session_token() {
            Some(token) => req.header(COOKIE, format!("{}={}", SESSION_COOKIE_NAME, token)),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, ClientError> {
        let resp = req.send().await?;
        read_json(resp).await
    }
}

/// Non-2xx bodies become errors carrying the server's `error` field.
async fn read_json(resp: Response) -> Result<Value, ClientError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_ERROR.to_string());
        tracing::debug!(status = status.as_u16(), error = %message, "request rejected");
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
}

fn project(rows: &mut [Value], query: &SelectQuery) {
    let Some(cols) = query.column_list() else { return };
    for row in rows.iter_mut() {
        if let Value::Object(map) = row {
            map.retain(|k, _| cols.iter().any(|c| c == k));
        }
    }
}

/// Whether the filters can only match nothing (an empty IN list).
/// Null or empty values have no query-string form and are rejected before any request.
fn matches_nothing(query: &SelectQuery) -> Result<bool, ClientError> {
    let mut empty_in = false;
    for f in &query.filters {
        let values = match &f.op {
            FilterOp::Eq(v) => std::slice::from_ref(v),
            FilterOp::In(values) => {
                empty_in |= values.is_empty();
                values.as_slice()
            }
        };
        if values.iter().any(|v| value_to_query_text(v).is_empty()) {
            return Err(ClientError::Rejected(format!("Filter on {} needs a non-empty value", f.column)));
        }
    }
    Ok(empty_in)
}

fn into_rows(v: Value) -> Vec<Value> {
    match v {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[async_trait]
impl Backend for RemoteClient {
    async fn select(&self, mut query: SelectQuery) -> Result<Vec<Value>, ClientError> {
        if matches_nothing(&query)? {
            return Ok(Vec::new());
        }
        if query.order.is_none() {
            query.order = self.default_order.clone();
        }
        let url = self.table_url(&query.table)?;
        let body = self
            .send(self.request(Method::GET, &url).query(&query.to_query_pairs()))
            .await?;
        let mut rows = into_rows(body);
        project(&mut rows, &query);
        Ok(rows)
    }

    async fn select_single(&self, mut query: SelectQuery) -> Result<Option<Value>, ClientError> {
        query.single = true;
        if matches_nothing(&query)? {
            return Ok(None);
        }
        let url = self.table_url(&query.table)?;
        let body = self
            .send(self.request(Method::GET, &url).query(&query.to_query_pairs()))
            .await?;
        let mut rows = into_rows(body);
        rows.truncate(1);
        project(&mut rows, &query);
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, ClientError> {
        let url = self.table_url(table)?;
        self.send(self.request(Method::POST, &url).json(&row)).await
    }

    async fn update(&self, table: &str, patch: Value, predicate: Predicate) -> Result<Value, ClientError> {
        let url = self.table_url(table)?;
        let pair = [(predicate.column(), value_to_query_text(predicate.value()))];
        self.send(self.request(Method::PATCH, &url).query(&pair).json(&patch))
            .await
    }

    async fn delete(&self, table: &str, predicate: Predicate) -> Result<(), ClientError> {
        let url = self.table_url(table)?;
        let pair = [(predicate.column(), value_to_query_text(predicate.value()))];
        self.send(self.request(Method::DELETE, &url).query(&pair)).await.map(|_| ())
    }
}

/// Session calls against `/api/auth/*`. The session cookie is kept on the client.
pub struct RemoteAuth<'a> {
    client: &'a RemoteClient,
}

impl RemoteAuth<'_> {
    /// `data` is the signed-in user.
    pub async fn sign_in(&self, email: &str, password: &str) -> Envelope<Value> {
        Envelope::from_result(self.try_sign_in(email, password).await)
    }

    async fn try_sign_in(&self, email: &str, password: &str) -> Result<Value, ClientError> {
        let url = format!("{}/api/auth/login", self.client.base_url);
        let resp = self
            .client
            .http
            .post(&url)
            .json(&json!({"email": email, "password": password}))
            .send()
            .await?;
        let token = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(session_token_from_set_cookie);
        let body = read_json(resp).await?;
        if let Some(token) = token {
            self.client.set_session(Some(token));
        }
        Ok(body.get("user").cloned().unwrap_or(Value::Null))
    }

    /// The local session is dropped even if the server call fails.
    pub async fn sign_out(&self) -> Envelope<Value> {
        let url = format!("{}/api/auth/logout", self.client.base_url);
        let r = self.client.send(self.client.request(Method::POST, &url)).await;
        self.client.set_session(None);
        match r {
            Ok(_) => Envelope::empty(),
            Err(e) => Envelope::err(e.to_string()),
        }
    }

    /// `data` is null when nobody is signed in.
    pub async fn current_user(&self) -> Envelope<Value> {
        let url = format!("{}/api/auth/user", self.client.base_url);
        let r = self
            .client
            .send(self.client.request(Method::GET, &url))
            .await
            .map(|v| if v.is_null() { None } else { Some(v) });
        Envelope::from_optional(r)
    }
}
