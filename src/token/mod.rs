//! OAuth token persistence.
//!
//! Two PostgreSQL tables, `oauth_tokens` and `oauth_refresh_tokens`, both
//! keyed by the token text with an index on `expires_at` (epoch millis). The
//! store is a trait so the HTTP tests can swap in an in-memory double.

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_postgres::NoTls;

/// Sweep cadence for expired-row cleanup.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct StoredToken {
    pub client_id: String,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn init(&self) -> ApiResult<()>;
    async fn save(&self, token: &str, client_id: &str, expires_at: i64) -> ApiResult<()>;
    async fn get(&self, token: &str) -> ApiResult<Option<StoredToken>>;
    async fn delete(&self, token: &str) -> ApiResult<()>;
    async fn save_refresh(&self, token: &str, client_id: &str, expires_at: i64) -> ApiResult<()>;
    async fn get_refresh(&self, token: &str) -> ApiResult<Option<StoredToken>>;
    async fn delete_refresh(&self, token: &str) -> ApiResult<()>;
    /// Purge rows with `expires_at` strictly before now; returns rows removed.
    async fn cleanup(&self) -> ApiResult<u64>;
    async fn close(&self);
}

pub struct PgTokenStore {
    client: tokio_postgres::Client,
    connection: Mutex<Option<JoinHandle<()>>>,
}

impl PgTokenStore {
    pub async fn connect(connection_string: &str) -> ApiResult<Self> {
        let connect = tokio_postgres::connect(connection_string, NoTls);
        let (client, connection) = tokio::time::timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| store_err("connect timeout"))?
            .map_err(|e| store_err(e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("token store connection error: {}", e);
            }
        });

        Ok(Self {
            client,
            connection: Mutex::new(Some(handle)),
        })
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

fn store_err(e: impl std::fmt::Display) -> ApiError {
    ApiError::InternalError(format!("token store error: {}", e))
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn init(&self) -> ApiResult<()> {
        self.client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS oauth_tokens (
                     access_token TEXT PRIMARY KEY,
                     client_id    TEXT NOT NULL,
                     expires_at   BIGINT NOT NULL,
                     created_at   TIMESTAMPTZ NOT NULL DEFAULT now()
                 );
                 CREATE INDEX IF NOT EXISTS oauth_tokens_expires_at_idx
                     ON oauth_tokens (expires_at);
                 CREATE TABLE IF NOT EXISTS oauth_refresh_tokens (
                     refresh_token TEXT PRIMARY KEY,
                     client_id     TEXT NOT NULL,
                     expires_at    BIGINT NOT NULL,
                     created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
                 );
                 CREATE INDEX IF NOT EXISTS oauth_refresh_tokens_expires_at_idx
                     ON oauth_refresh_tokens (expires_at);",
            )
            .await
            .map_err(store_err)
    }

    async fn save(&self, token: &str, client_id: &str, expires_at: i64) -> ApiResult<()> {
        self.client
            .execute(
                "INSERT INTO oauth_tokens (access_token, client_id, expires_at)
                 VALUES ($1, $2, $3)",
                &[&token, &client_id, &expires_at],
            )
            .await
            .map(|_| ())
            .map_err(store_err)
    }

    async fn get(&self, token: &str) -> ApiResult<Option<StoredToken>> {
        let row = self
            .client
            .query_opt(
                "SELECT client_id, expires_at FROM oauth_tokens WHERE access_token = $1",
                &[&token],
            )
            .await
            .map_err(store_err)?;
        Ok(row.map(|r| StoredToken {
            client_id: r.get(0),
            expires_at: r.get(1),
        }))
    }

    async fn delete(&self, token: &str) -> ApiResult<()> {
        self.client
            .execute("DELETE FROM oauth_tokens WHERE access_token = $1", &[&token])
            .await
            .map(|_| ())
            .map_err(store_err)
    }

    async fn save_refresh(&self, token: &str, client_id: &str, expires_at: i64) -> ApiResult<()> {
        self.client
            .execute(
                "INSERT INTO oauth_refresh_tokens (refresh_token, client_id, expires_at)
                 VALUES ($1, $2, $3)",
                &[&token, &client_id, &expires_at],
            )
            .await
            .map(|_| ())
            .map_err(store_err)
    }

    async fn get_refresh(&self, token: &str) -> ApiResult<Option<StoredToken>> {
        let row = self
            .client
            .query_opt(
                "SELECT client_id, expires_at FROM oauth_refresh_tokens WHERE refresh_token = $1",
                &[&token],
            )
            .await
            .map_err(store_err)?;
        Ok(row.map(|r| StoredToken {
            client_id: r.get(0),
            expires_at: r.get(1),
        }))
    }

    async fn delete_refresh(&self, token: &str) -> ApiResult<()> {
        self.client
            .execute(
                "DELETE FROM oauth_refresh_tokens WHERE refresh_token = $1",
                &[&token],
            )
            .await
            .map(|_| ())
            .map_err(store_err)
    }

    async fn cleanup(&self) -> ApiResult<u64> {
        let now = Self::now_ms();
        let access = self
            .client
            .execute("DELETE FROM oauth_tokens WHERE expires_at < $1", &[&now])
            .await
            .map_err(store_err)?;
        let refresh = self
            .client
            .execute(
                "DELETE FROM oauth_refresh_tokens WHERE expires_at < $1",
                &[&now],
            )
            .await
            .map_err(store_err)?;
        Ok(access + refresh)
    }

    async fn close(&self) {
        if let Some(handle) = self.connection.lock().await.take() {
            handle.abort();
        }
    }
}

/// Background task purging expired tokens every [`CLEANUP_INTERVAL`].
pub fn spawn_sweeper(store: Arc<dyn TokenStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            ticker.tick().await;
            match store.cleanup().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("token sweeper removed {} expired rows", n),
                Err(e) => tracing::warn!("token sweeper failed: {}", e),
            }
        }
    })
}
