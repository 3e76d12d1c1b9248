//! MLS-number redirect service.
//!
//! `GET /listing/{mls}` verifies the listing exists through the same
//! gateway the OData surface uses, then 302s to the canonical listing page
//! under `BASE_URL`. Unknown numbers answer the 404 envelope.

use crate::error::ApiError;
use crate::resource::PROPERTY;
use crate::server::handlers::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(mls_number): Path<String>,
) -> Result<Response, ApiError> {
    let sql = format!(
        "SELECT {key} FROM {table} WHERE {key} = @keyValue",
        key = PROPERTY.key_column(),
        table = PROPERTY.table,
    );
    let params = vec![(
        "keyValue".to_string(),
        crate::db::SqlValue::Str(mls_number.clone()),
    )];

    let rows = state.gateway.query(&sql, &params).await?;
    if rows.is_empty() {
        return Err(ApiError::NotFound {
            set: "Listing".to_string(),
            key: mls_number,
        });
    }

    let location = format!("{}/property/{}", state.config.base_url, mls_number);
    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, location)],
    )
        .into_response())
}
