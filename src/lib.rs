//! Tshirtify, a custom t-shirt storefront.
//!
//! JSON API over Postgres: public catalog browsing, customer carts and
//! checkout (guest checkout included), merchant product authoring, and an
//! admin back office with running sales aggregates.

use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod routes;

pub use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
    pub config: Arc<Config>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "tshirtify"})) }),
        )
        .nest("/api/auth", routes::auth::router())
        .nest("/api/products", routes::products::router())
        .nest("/api/cart", routes::cart::router())
        .nest("/api/orders", routes::orders::router())
        .nest("/api/designers", routes::designers::router())
        .nest("/api/admin", routes::admin::router())
        .fallback(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "Route not found"})),
            )
        })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
