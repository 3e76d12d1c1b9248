//! Token endpoint and bearer lifecycle tests: grants, refresh, expiry, and
//! cleanup semantics of the store.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use resogate::token::TokenStore;
use serde_json::Value;
use tower::ServiceExt; // for oneshot

async fn post_token(app: &TestApp, body: &str) -> axum::response::Response {
    app.router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/odata/token")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

fn is_hex_token(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

#[tokio::test]
async fn test_client_credentials_grant() {
    let app = build_app(MockGateway::new()).await;
    let response = post_token(
        &app,
        "grant_type=client_credentials&client_id=test-client&client_secret=test-secret",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert!(is_hex_token(&json["access_token"]));
    assert!(is_hex_token(&json["refresh_token"]));
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["expires_in"], 3600);

    // both tokens were persisted
    let access = json["access_token"].as_str().unwrap();
    let refresh = json["refresh_token"].as_str().unwrap();
    assert!(app.tokens.get(access).await.unwrap().is_some());
    assert!(app.tokens.get_refresh(refresh).await.unwrap().is_some());
}

#[tokio::test]
async fn test_issued_token_opens_protected_routes() {
    let app = build_app(MockGateway::new()).await;
    let grant = response_json(
        post_token(
            &app,
            "grant_type=client_credentials&client_id=test-client&client_secret=test-secret",
        )
        .await,
    )
    .await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/odata/Office")
                .header(
                    "Authorization",
                    format!("Bearer {}", grant["access_token"].as_str().unwrap()),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_bad_secret_rejected() {
    let app = build_app(MockGateway::new()).await;
    let response = post_token(
        &app,
        "grant_type=client_credentials&client_id=test-client&client_secret=wrong",
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = response_json(response).await;
    assert_eq!(json["error"], "invalid_client");
}

#[tokio::test]
async fn test_unsupported_grant_type() {
    let app = build_app(MockGateway::new()).await;
    let response = post_token(
        &app,
        "grant_type=password&client_id=test-client&client_secret=test-secret",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn test_refresh_grant_issues_new_access_token() {
    let app = build_app(MockGateway::new()).await;
    let grant = response_json(
        post_token(
            &app,
            "grant_type=client_credentials&client_id=test-client&client_secret=test-secret",
        )
        .await,
    )
    .await;
    let refresh = grant["refresh_token"].as_str().unwrap().to_string();

    let response = post_token(
        &app,
        &format!("grant_type=refresh_token&refresh_token={}", refresh),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert!(is_hex_token(&json["access_token"]));
    assert_ne!(json["access_token"], grant["access_token"]);
    // the refresh token itself is reused
    assert_eq!(json["refresh_token"].as_str().unwrap(), refresh);
}

#[tokio::test]
async fn test_refresh_without_token_is_invalid_request() {
    let app = build_app(MockGateway::new()).await;
    let response = post_token(&app, "grant_type=refresh_token").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["error"], "invalid_request");
}

#[tokio::test]
async fn test_refresh_with_unknown_token_is_invalid_grant() {
    let app = build_app(MockGateway::new()).await;
    let response = post_token(&app, "grant_type=refresh_token&refresh_token=nope").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = response_json(response).await;
    assert_eq!(json["error"], "invalid_grant");
}

#[tokio::test]
async fn test_expired_refresh_token_deleted_and_rejected() {
    let app = build_app(MockGateway::new()).await;
    app.tokens
        .save_refresh("stale-refresh", "test-client", 1)
        .await
        .unwrap();

    let response =
        post_token(&app, "grant_type=refresh_token&refresh_token=stale-refresh").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // removed lazily on the failed attempt
    assert!(app
        .tokens
        .get_refresh("stale-refresh")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_expired_access_token_deleted_and_rejected() {
    let app = build_app(MockGateway::new()).await;
    app.tokens
        .save("stale-access", "test-client", 1)
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/odata/Property")
                .header("Authorization", "Bearer stale-access")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.tokens.get("stale-access").await.unwrap().is_none());
}

#[tokio::test]
async fn test_non_bearer_scheme_rejected() {
    let app = build_app(MockGateway::new()).await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/odata/Property")
                .header("Authorization", format!("Basic {}", TEST_BEARER))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cleanup_removes_exactly_expired_rows() {
    let app = build_app(MockGateway::new()).await;
    let future = chrono::Utc::now().timestamp_millis() + 60_000;

    app.tokens.save("live", "test-client", future).await.unwrap();
    app.tokens.save("dead", "test-client", 1).await.unwrap();
    app.tokens
        .save_refresh("dead-refresh", "test-client", 1)
        .await
        .unwrap();

    // TEST_BEARER (live) + live survive; the two expired rows go
    let removed = app.tokens.cleanup().await.unwrap();
    assert_eq!(removed, 2);
    assert!(app.tokens.get("live").await.unwrap().is_some());
    assert!(app.tokens.get("dead").await.unwrap().is_none());
    assert!(app
        .tokens
        .get_refresh("dead-refresh")
        .await
        .unwrap()
        .is_none());
}
