//! Runtime configuration.
//!
//! Everything comes from the environment:
//!
//! - `OAUTH_CLIENT_ID` / `OAUTH_CLIENT_SECRET` - credentials accepted by the
//!   token endpoint
//! - `PG_CONNECTION_STRING` - PostgreSQL token store
//! - `MSSQL_HOST`, `MSSQL_PORT`, `MSSQL_DATABASE`, `MSSQL_USER`,
//!   `MSSQL_PASSWORD` - backend SQL Server reached by the gateway
//! - `BASE_URL` - public site the redirect service points at
//! - `PORT` - listen port (the `--port` flag wins when given)
//! - `DB_REQUEST_TIMEOUT_SECS` - per-query gateway timeout, default 30

use anyhow::Context;
use std::env;

pub const ENV_OAUTH_CLIENT_ID: &str = "OAUTH_CLIENT_ID";
pub const ENV_OAUTH_CLIENT_SECRET: &str = "OAUTH_CLIENT_SECRET";
pub const ENV_PG_CONNECTION_STRING: &str = "PG_CONNECTION_STRING";
pub const ENV_BASE_URL: &str = "BASE_URL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_MSSQL_HOST: &str = "MSSQL_HOST";
pub const ENV_MSSQL_PORT: &str = "MSSQL_PORT";
pub const ENV_MSSQL_DATABASE: &str = "MSSQL_DATABASE";
pub const ENV_MSSQL_USER: &str = "MSSQL_USER";
pub const ENV_MSSQL_PASSWORD: &str = "MSSQL_PASSWORD";
pub const ENV_DB_REQUEST_TIMEOUT_SECS: &str = "DB_REQUEST_TIMEOUT_SECS";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub pg_connection_string: String,
    pub base_url: String,
    pub port: u16,
    pub mssql: MssqlConfig,
    pub db_request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MssqlConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let required = |name: &str| {
            env::var(name).with_context(|| format!("missing environment variable {}", name))
        };

        Ok(Config {
            oauth_client_id: required(ENV_OAUTH_CLIENT_ID)?,
            oauth_client_secret: required(ENV_OAUTH_CLIENT_SECRET)?,
            pg_connection_string: required(ENV_PG_CONNECTION_STRING)?,
            base_url: env::var(ENV_BASE_URL)
                .unwrap_or_else(|_| "http://localhost".to_string()),
            port: env::var(ENV_PORT)
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            mssql: MssqlConfig {
                host: required(ENV_MSSQL_HOST)?,
                port: env::var(ENV_MSSQL_PORT)
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(1433),
                database: required(ENV_MSSQL_DATABASE)?,
                user: required(ENV_MSSQL_USER)?,
                password: required(ENV_MSSQL_PASSWORD)?,
            },
            db_request_timeout_secs: env::var(ENV_DB_REQUEST_TIMEOUT_SECS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DB_TIMEOUT_SECS),
        })
    }

    /// Configuration used by tests; no environment reads.
    pub fn for_tests() -> Self {
        Config {
            oauth_client_id: "test-client".to_string(),
            oauth_client_secret: "test-secret".to_string(),
            pg_connection_string: String::new(),
            base_url: "http://listings.example.com".to_string(),
            port: 0,
            mssql: MssqlConfig {
                host: "localhost".to_string(),
                port: 1433,
                database: "mls".to_string(),
                user: "sa".to_string(),
                password: String::new(),
            },
            db_request_timeout_secs: 30,
        }
    }
}
