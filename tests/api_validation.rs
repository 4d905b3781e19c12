//! Router-level tests for the request-validation and auth-gating layers.
//! These exercise paths that are rejected before any query runs, so a lazy
//! pool with no live database behind it is enough.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use tshirtify::{app, AppState, Config};

fn test_state() -> AppState {
    let config = Config {
        database_url: "postgres://localhost/unused".to_string(),
        port: 0,
        jwt_secret: "test-secret".to_string(),
        nats_url: None,
        admin_email: None,
        admin_password: None,
    };
    AppState {
        db: sqlx::PgPool::connect_lazy(&config.database_url).expect("lazy pool"),
        nats: None,
        config: Arc::new(config),
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_service_name() {
    let response = app(test_state())
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "tshirtify");
}

#[tokio::test]
async fn unknown_route_is_a_json_404() {
    let response = app(test_state())
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Route not found");
}

#[tokio::test]
async fn cart_requires_a_token() {
    let response = app(test_state())
        .oneshot(
            Request::post("/api/cart/add")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"product_id": 1, "quantity": 1, "size": "M"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Access token required");
}

#[tokio::test]
async fn garbage_bearer_token_is_rejected() {
    let response = app(test_state())
        .oneshot(
            Request::get("/api/orders")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let response = app(test_state())
        .oneshot(
            Request::post("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"email": "not-an-email", "password": "longenough", "name": "Pat"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["errors"]["email"].is_array());
}

#[tokio::test]
async fn malformed_json_body_is_a_400() {
    let response = app(test_state())
        .oneshot(
            Request::post("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn guest_checkout_requires_a_full_shipping_address() {
    let response = app(test_state())
        .oneshot(
            Request::post("/api/orders")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"shipping_address": "short", "payment_method": "credit_card"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn guest_checkout_requires_a_payment_method() {
    let response = app(test_state())
        .oneshot(
            Request::post("/api/orders")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"shipping_address": "221B Baker Street, London"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_requires_a_query() {
    let response = app(test_state())
        .oneshot(Request::get("/api/products/search").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Search query is required");
}
