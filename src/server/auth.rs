//! Bearer-token verification middleware and the OAuth2 token endpoint
//! (`client_credentials` and `refresh_token` grants).

use crate::error::ApiError;
use crate::server::handlers::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Form, Json,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;
pub const REFRESH_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

/// Client id of the caller, attached to the request once the bearer checks
/// out.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient(pub String);

/// 256-bit random token, hex-encoded.
fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Axum middleware guarding the entity-set routes. Missing, unknown or
/// expired bearers answer 401; expired rows are removed on sight.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    let stored = state
        .tokens
        .get(token)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if stored.expires_at < now_ms() {
        state.tokens.delete(token).await?;
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut()
        .insert(AuthenticatedClient(stored.client_id));
    Ok(next.run(req).await)
}

// ==================== Token endpoint ====================

#[derive(Debug, Deserialize)]
pub struct TokenGrantRequest {
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenGrantResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub refresh_token: String,
}

/// RFC 6749 error body: `{error, error_description?}`.
#[derive(Debug)]
pub struct OAuthError {
    pub status: StatusCode,
    pub error: &'static str,
    pub description: Option<String>,
}

impl OAuthError {
    fn new(status: StatusCode, error: &'static str) -> Self {
        Self {
            status,
            error,
            description: None,
        }
    }
}

impl From<ApiError> for OAuthError {
    fn from(e: ApiError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "server_error",
            description: Some(e.to_string()),
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            error: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            error_description: Option<String>,
        }
        (
            self.status,
            Json(ErrorBody {
                error: self.error,
                error_description: self.description,
            }),
        )
            .into_response()
    }
}

pub async fn token_handler(
    State(state): State<AppState>,
    Form(req): Form<TokenGrantRequest>,
) -> Result<Json<TokenGrantResponse>, OAuthError> {
    match req.grant_type.as_deref() {
        Some("client_credentials") => client_credentials_grant(&state, &req).await,
        Some("refresh_token") => refresh_token_grant(&state, &req).await,
        _ => Err(OAuthError::new(
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
        )),
    }
}

async fn client_credentials_grant(
    state: &AppState,
    req: &TokenGrantRequest,
) -> Result<Json<TokenGrantResponse>, OAuthError> {
    let client_id = req.client_id.as_deref().unwrap_or_default();
    let client_secret = req.client_secret.as_deref().unwrap_or_default();

    let id_ok = constant_time_eq(client_id.as_bytes(), state.config.oauth_client_id.as_bytes());
    let secret_ok = constant_time_eq(
        client_secret.as_bytes(),
        state.config.oauth_client_secret.as_bytes(),
    );
    if !id_ok || !secret_ok {
        return Err(OAuthError::new(StatusCode::UNAUTHORIZED, "invalid_client"));
    }

    let access_token = new_token();
    let refresh_token = new_token();
    let now = now_ms();

    state
        .tokens
        .save(&access_token, client_id, now + ACCESS_TOKEN_TTL_SECS * 1000)
        .await?;
    state
        .tokens
        .save_refresh(
            &refresh_token,
            client_id,
            now + REFRESH_TOKEN_TTL_SECS * 1000,
        )
        .await?;

    tracing::info!("issued access token for client '{}'", client_id);

    Ok(Json(TokenGrantResponse {
        access_token,
        token_type: "Bearer",
        expires_in: ACCESS_TOKEN_TTL_SECS,
        refresh_token,
    }))
}

async fn refresh_token_grant(
    state: &AppState,
    req: &TokenGrantRequest,
) -> Result<Json<TokenGrantResponse>, OAuthError> {
    let refresh_token = req
        .refresh_token
        .as_deref()
        .ok_or_else(|| OAuthError::new(StatusCode::BAD_REQUEST, "invalid_request"))?;

    let stored = state
        .tokens
        .get_refresh(refresh_token)
        .await?
        .ok_or_else(|| OAuthError::new(StatusCode::UNAUTHORIZED, "invalid_grant"))?;

    if stored.expires_at < now_ms() {
        state.tokens.delete_refresh(refresh_token).await?;
        return Err(OAuthError::new(StatusCode::UNAUTHORIZED, "invalid_grant"));
    }

    let access_token = new_token();
    state
        .tokens
        .save(
            &access_token,
            &stored.client_id,
            now_ms() + ACCESS_TOKEN_TTL_SECS * 1000,
        )
        .await?;

    Ok(Json(TokenGrantResponse {
        access_token,
        token_type: "Bearer",
        expires_in: ACCESS_TOKEN_TTL_SECS,
        refresh_token: refresh_token.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_shape() {
        let token = new_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(new_token(), new_token());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secre"));
    }
}
