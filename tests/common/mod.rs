//! Shared test doubles and helpers for the HTTP suites: a recording mock
//! gateway, an in-memory token store, and an app builder wired like `main`.

use async_trait::async_trait;
use axum::Router;
use resogate::db::{Gateway, Params, Row};
use resogate::error::ApiResult;
use resogate::resource::ListingKeyCache;
use resogate::server::{create_router, AppState};
use resogate::token::{StoredToken, TokenStore};
use resogate::Config;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const TEST_BEARER: &str = "itest-access-token";

#[derive(Debug, Clone)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Params,
}

/// Gateway double: records every statement and answers from substring
/// matchers, first match wins, empty recordset otherwise.
#[derive(Default)]
pub struct MockGateway {
    responses: Vec<(String, Vec<Row>)>,
    recorded: Mutex<Vec<RecordedQuery>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, sql_substring: &str, rows: Vec<Row>) -> Self {
        self.responses.push((sql_substring.to_string(), rows));
        self
    }

    pub fn recorded(&self) -> Vec<RecordedQuery> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn query(&self, sql: &str, params: &Params) -> ApiResult<Vec<Row>> {
        self.recorded.lock().unwrap().push(RecordedQuery {
            sql: sql.to_string(),
            params: params.clone(),
        });
        for (pattern, rows) in &self.responses {
            if sql.contains(pattern.as_str()) {
                return Ok(rows.clone());
            }
        }
        Ok(Vec::new())
    }
}

/// Token store double over two in-memory maps.
#[derive(Default)]
pub struct MemoryTokenStore {
    access: Mutex<HashMap<String, StoredToken>>,
    refresh: Mutex<HashMap<String, StoredToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn init(&self) -> ApiResult<()> {
        Ok(())
    }

    async fn save(&self, token: &str, client_id: &str, expires_at: i64) -> ApiResult<()> {
        self.access.lock().unwrap().insert(
            token.to_string(),
            StoredToken {
                client_id: client_id.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, token: &str) -> ApiResult<Option<StoredToken>> {
        Ok(self.access.lock().unwrap().get(token).cloned())
    }

    async fn delete(&self, token: &str) -> ApiResult<()> {
        self.access.lock().unwrap().remove(token);
        Ok(())
    }

    async fn save_refresh(&self, token: &str, client_id: &str, expires_at: i64) -> ApiResult<()> {
        self.refresh.lock().unwrap().insert(
            token.to_string(),
            StoredToken {
                client_id: client_id.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get_refresh(&self, token: &str) -> ApiResult<Option<StoredToken>> {
        Ok(self.refresh.lock().unwrap().get(token).cloned())
    }

    async fn delete_refresh(&self, token: &str) -> ApiResult<()> {
        self.refresh.lock().unwrap().remove(token);
        Ok(())
    }

    async fn cleanup(&self) -> ApiResult<u64> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut removed = 0;
        for map in [&self.access, &self.refresh] {
            let mut map = map.lock().unwrap();
            let before = map.len();
            map.retain(|_, t| t.expires_at >= now);
            removed += (before - map.len()) as u64;
        }
        Ok(removed)
    }

    async fn close(&self) {}
}

pub struct TestApp {
    pub router: Router,
    pub gateway: Arc<MockGateway>,
    pub tokens: Arc<MemoryTokenStore>,
}

/// App wired like `main`, with a valid bearer already in the store.
pub async fn build_app(gateway: MockGateway) -> TestApp {
    let gateway = Arc::new(gateway);
    let tokens = Arc::new(MemoryTokenStore::new());
    tokens
        .save(
            TEST_BEARER,
            "test-client",
            chrono::Utc::now().timestamp_millis() + 3_600_000,
        )
        .await
        .unwrap();

    let state = AppState {
        gateway: gateway.clone(),
        tokens: tokens.clone(),
        config: Arc::new(Config::for_tests()),
        listing_keys: Arc::new(ListingKeyCache::new()),
    };

    TestApp {
        router: create_router(state),
        gateway,
        tokens,
    }
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    let mut row = Row::new();
    for (column, value) in pairs {
        row.insert(column.to_string(), value.clone());
    }
    row
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub async fn response_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}
