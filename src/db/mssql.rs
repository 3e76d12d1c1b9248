//! SQL Server gateway over TDS.
//!
//! Holds at most one live client per instance plus a circuit breaker: a
//! transient socket error opens the breaker, a dedicated task reconnects with
//! capped back-off, and queries arriving while the breaker is open wait up to
//! [`RECONNECT_WAIT`] for recovery before failing with
//! `"Database not connected"`.

use crate::config::MssqlConfig;
use crate::db::{Gateway, Params, Row, SqlValue};
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tiberius::{AuthMethod, Client, ColumnData, FromSql, Query};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

type TdsClient = Client<Compat<TcpStream>>;

const RECONNECT_WAIT: Duration = Duration::from_secs(30);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub struct MssqlGateway {
    inner: Arc<Inner>,
}

struct Inner {
    config: MssqlConfig,
    request_timeout: Duration,
    client: Mutex<Option<TdsClient>>,
    reconnecting: AtomicBool,
    reconnected: Notify,
}

impl MssqlGateway {
    pub fn new(config: MssqlConfig, request_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                request_timeout,
                client: Mutex::new(None),
                reconnecting: AtomicBool::new(false),
                reconnected: Notify::new(),
            }),
        }
    }
}

impl Inner {
    async fn connect(&self) -> Result<TdsClient, tiberius::error::Error> {
        let mut cfg = tiberius::Config::new();
        cfg.host(&self.config.host);
        cfg.port(self.config.port);
        cfg.database(&self.config.database);
        cfg.authentication(AuthMethod::sql_server(
            &self.config.user,
            &self.config.password,
        ));
        cfg.trust_cert();

        let tcp = TcpStream::connect(cfg.get_addr()).await?;
        tcp.set_nodelay(true)?;
        Client::connect(cfg, tcp.compat_write()).await
    }

    /// Open the breaker and keep retrying the connection until it comes back.
    fn trigger_reconnect(self: &Arc<Self>) {
        if self.reconnecting.swap(true, Ordering::SeqCst) {
            return; // a reconnect task is already running
        }
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let mut backoff = Duration::from_secs(1);
            loop {
                tokio::time::sleep(backoff).await;
                match inner.connect().await {
                    Ok(client) => {
                        *inner.client.lock().await = Some(client);
                        inner.reconnecting.store(false, Ordering::SeqCst);
                        inner.reconnected.notify_waiters();
                        tracing::info!("backend connection re-established");
                        return;
                    }
                    Err(e) => {
                        tracing::warn!("backend reconnect failed: {}", e);
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
            }
        });
    }

    async fn run(&self, sql: &str, params: &Params) -> Result<Vec<Row>, tiberius::error::Error> {
        let mut guard = self.client.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let client = guard.as_mut().unwrap();

        let rewritten = rewrite_markers(sql, params);
        let mut query = Query::new(rewritten);
        for (_, value) in params {
            match value {
                SqlValue::Null => query.bind(Option::<String>::None),
                SqlValue::Int(i) => query.bind(*i),
                SqlValue::Float(f) => query.bind(*f),
                SqlValue::Str(s) | SqlValue::DateTime(s) => query.bind(s.clone()),
            }
        }

        let stream = query.query(client).await?;
        let rows = stream.into_first_result().await?;
        Ok(rows.into_iter().map(row_to_json).collect())
    }
}

#[async_trait]
impl Gateway for MssqlGateway {
    async fn query(&self, sql: &str, params: &Params) -> ApiResult<Vec<Row>> {
        let inner = &self.inner;

        if inner.reconnecting.load(Ordering::SeqCst) {
            // Breaker is open: give the reconnect task a window to recover.
            if tokio::time::timeout(RECONNECT_WAIT, inner.reconnected.notified())
                .await
                .is_err()
            {
                return Err(ApiError::Backend("Database not connected".to_string()));
            }
        }

        match tokio::time::timeout(inner.request_timeout, inner.run(sql, params)).await {
            Ok(Ok(rows)) => Ok(rows),
            Ok(Err(e)) => {
                if is_transient(&e) {
                    inner.client.lock().await.take();
                    inner.trigger_reconnect();
                }
                Err(ApiError::Backend(e.to_string()))
            }
            Err(_) => {
                // the dropped query leaves the stream mid-protocol; discard
                // the connection and let the breaker rebuild it
                inner.client.lock().await.take();
                inner.trigger_reconnect();
                Err(ApiError::Backend("Request timeout".to_string()))
            }
        }
    }
}

fn is_transient(e: &tiberius::error::Error) -> bool {
    matches!(
        e,
        tiberius::error::Error::Io { .. } | tiberius::error::Error::Tls(_)
    )
}

/// Replace named markers (`@filter0`, `@keyValue`, ...) with the positional
/// `@PN` form the TDS protocol requires. Longer names go first so `@filter1`
/// cannot clobber the prefix of `@filter10`.
fn rewrite_markers(sql: &str, params: &Params) -> String {
    let mut order: Vec<usize> = (0..params.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(params[i].0.len()));

    let mut out = sql.to_string();
    for i in order {
        out = out.replace(&format!("@{}", params[i].0), &format!("@P{}", i + 1));
    }
    out
}

fn row_to_json(row: tiberius::Row) -> Row {
    let names: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let mut map = serde_json::Map::new();
    for (name, data) in names.into_iter().zip(row.into_iter()) {
        map.insert(name, column_data_to_json(data));
    }
    map
}

fn column_data_to_json(data: ColumnData<'static>) -> Value {
    match &data {
        ColumnData::U8(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::I16(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::I32(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::I64(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::F32(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::F64(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::Bit(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::String(v) => v
            .as_ref()
            .map(|s| Value::from(s.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Numeric(v) => v.map(|n| Value::from(f64::from(n))).unwrap_or(Value::Null),
        ColumnData::Guid(v) => v.map(|g| Value::from(g.to_string())).unwrap_or(Value::Null),
        ColumnData::Binary(v) => v
            .as_ref()
            .map(|b| Value::from(hex::encode(b.as_ref())))
            .unwrap_or(Value::Null),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|x| Value::from(x.as_ref().clone().into_string()))
            .unwrap_or(Value::Null),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            match NaiveDateTime::from_sql(&data) {
                Ok(Some(dt)) => Value::from(dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()),
                _ => Value::Null,
            }
        }
        ColumnData::Date(_) => match NaiveDate::from_sql(&data) {
            Ok(Some(d)) => Value::from(d.format("%Y-%m-%d").to_string()),
            _ => Value::Null,
        },
        ColumnData::Time(_) => match NaiveTime::from_sql(&data) {
            Ok(Some(t)) => Value::from(t.format("%H:%M:%S").to_string()),
            _ => Value::Null,
        },
        ColumnData::DateTimeOffset(_) => match chrono::DateTime::<Utc>::from_sql(&data) {
            Ok(Some(dt)) => Value::from(dt.to_rfc3339()),
            _ => Value::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_markers_in_order() {
        let params: Params = vec![
            ("filter0".to_string(), SqlValue::Str("LA".to_string())),
            ("filter1".to_string(), SqlValue::Int(3)),
        ];
        let sql = "SELECT * FROM T WHERE CITY = @filter0 AND BEDROOMS > @filter1";
        assert_eq!(
            rewrite_markers(sql, &params),
            "SELECT * FROM T WHERE CITY = @P1 AND BEDROOMS > @P2"
        );
    }

    #[test]
    fn test_rewrite_markers_prefix_safe() {
        // eleven params: @filter10 must not be rewritten as "@P2" + "0"
        let params: Params = (0..11)
            .map(|i| (format!("filter{}", i), SqlValue::Int(i)))
            .collect();
        let sql = "A = @filter1 AND B = @filter10";
        assert_eq!(rewrite_markers(sql, &params), "A = @P2 AND B = @P11");
    }

    #[test]
    fn test_rewrite_key_value_marker() {
        let params: Params = vec![(
            "keyValue".to_string(),
            SqlValue::Str("MLS-2024-00001".to_string()),
        )];
        assert_eq!(
            rewrite_markers("WHERE MLSNUMBER = @keyValue", &params),
            "WHERE MLSNUMBER = @P1"
        );
    }
}
