//! Backend database gateway contract.
//!
//! The query engine only ever sees this interface: parameterized SQL in,
//! JSON-shaped rows out. The production implementation speaks TDS to a
//! remote SQL Server (see [`mssql`]); tests substitute a recording mock.

pub mod mssql;

use crate::error::ApiResult;
use async_trait::async_trait;
use serde::Serialize;

/// A result row, keyed by backend column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A value bound to a named SQL parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    /// Datetime literals keep their text form and are coerced by the server.
    DateTime(String),
}

impl SqlValue {
    pub fn as_json(&self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Int(i) => serde_json::Value::from(*i),
            SqlValue::Float(f) => serde_json::Value::from(*f),
            SqlValue::Str(s) | SqlValue::DateTime(s) => serde_json::Value::from(s.clone()),
        }
    }
}

/// Named parameters in the order their markers were allocated.
pub type Params = Vec<(String, SqlValue)>;

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Run one parameterized statement and collect its rows.
    ///
    /// Every error - including a lost connection - surfaces as
    /// `ApiError::Backend` with the driver's message.
    async fn query(&self, sql: &str, params: &Params) -> ApiResult<Vec<Row>>;
}
