//! OData HTTP handlers: service document, metadata, entity-set dispatch,
//! and the terminal error shaping.

use crate::config::Config;
use crate::db::Gateway;
use crate::error::ApiError;
use crate::odata::ODataParams;
use crate::resource::{self, driver, ListingKeyCache};
use crate::server::metadata;
use crate::token::TokenStore;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn Gateway>,
    pub tokens: Arc<dyn TokenStore>,
    pub config: Arc<Config>,
    pub listing_keys: Arc<ListingKeyCache>,
}

// ==================== Error shaping ====================

#[derive(Debug, Serialize)]
struct ODataErrorBody {
    error: ODataErrorDetail,
}

#[derive(Debug, Serialize)]
struct ODataErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound { .. } | ApiError::UnknownEntitySet(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            // parse and backend failures both surface as 500
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ODataErrorBody {
            error: ODataErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

// ==================== Context URLs ====================

/// Service root reconstructed from the request, e.g. `http://host/odata`.
fn service_root(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("{}://{}/odata", scheme, host)
}

// ==================== Handlers ====================

pub async fn service_document(headers: HeaderMap) -> Json<Value> {
    let root = service_root(&headers);
    let sets: Vec<Value> = resource::all_resources()
        .iter()
        .map(|r| {
            json!({
                "name": r.name,
                "kind": "EntitySet",
                "url": r.name,
            })
        })
        .collect();

    Json(json!({
        "@odata.context": format!("{}/$metadata", root),
        "value": sets,
    }))
}

pub async fn metadata_document() -> Response {
    (
        [(header::CONTENT_TYPE, "application/xml")],
        metadata::csdl(),
    )
        .into_response()
}

/// One route serves both collection and single-entity addressing:
/// `/odata/Property` lists, `/odata/Property('<k>')` fetches.
pub async fn entity_dispatch(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Query(query): Query<ODataParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let root = service_root(&headers);

    if let Some(res) = resource::resource_by_name(&segment) {
        let envelope = driver::list(
            state.gateway.as_ref(),
            &state.listing_keys,
            res,
            &query,
            &root,
        )
        .await?;
        return Ok(Json(envelope).into_response());
    }

    if let Some((set, key)) = parse_key_segment(&segment) {
        let res = resource::resource_by_name(set)
            .ok_or_else(|| ApiError::UnknownEntitySet(set.to_string()))?;
        let entity = driver::get(
            state.gateway.as_ref(),
            &state.listing_keys,
            res,
            key,
            &query,
            &root,
        )
        .await?;
        return Ok(Json(entity).into_response());
    }

    Err(ApiError::UnknownEntitySet(segment))
}

/// Split `Property('X')` / `Member(5)` into set name and raw key text.
fn parse_key_segment(segment: &str) -> Option<(&str, &str)> {
    let open = segment.find('(')?;
    let close = segment.rfind(')')?;
    if close != segment.len() - 1 || close <= open {
        return None;
    }
    let set = &segment[..open];
    let key = &segment[open + 1..close];
    if set.is_empty() || key.is_empty() {
        return None;
    }
    Some((set, key))
}
