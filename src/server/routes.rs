use axum::{
    http::{HeaderName, HeaderValue},
    middleware,
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::auth::{require_bearer, token_handler};
use super::handlers::{entity_dispatch, metadata_document, service_document, AppState};
use crate::redirect::redirect_handler;

const ODATA_VERSION_HEADER: HeaderName = HeaderName::from_static("odata-version");

/// Every response carries the protocol version.
async fn set_odata_version(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(ODATA_VERSION_HEADER, HeaderValue::from_static("4.0"));
    response
}

pub fn create_router(state: AppState) -> Router {
    // entity sets sit behind the bearer check; the static routes stay open
    let protected = Router::new()
        .route("/odata/:segment", get(entity_dispatch))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/odata", get(service_document))
        .route("/odata/", get(service_document))
        .route("/odata/$metadata", get(metadata_document))
        .route("/odata/token", post(token_handler))
        .route("/listing/:mls", get(redirect_handler))
        .merge(protected)
        .layer(middleware::map_response(set_odata_version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
