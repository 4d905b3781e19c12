//! Back-office analytics for merchants and admins.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{AdminUser, Staff};
use crate::db;
use crate::error::ApiError;
use crate::models::SalesAggregate;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/my-products", get(my_products))
        .route("/product/:id/analytics", get(product_analytics))
        .route("/sales-report", get(sales_report))
        .route("/customer-analytics", get(customer_analytics))
}

async fn dashboard(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let dashboard = db::analytics::dashboard(&state.db).await?;
    Ok(Json(json!({ "dashboard": dashboard })))
}

async fn my_products(
    State(state): State<AppState>,
    Staff(author): Staff,
) -> Result<Json<serde_json::Value>, ApiError> {
    let products = db::analytics::products_with_sales(&state.db, author.id).await?;

    let total_quantity: i64 = products.iter().map(|p| p.quantity_sold).sum();
    let total_revenue: Decimal = products.iter().map(|p| p.total_revenue).sum();
    let total_profit: Decimal = products.iter().map(|p| p.total_profit).sum();

    Ok(Json(json!({
        "products": products,
        "summary": {
            "product_count": products.len(),
            "total_quantity_sold": total_quantity,
            "total_revenue": total_revenue,
            "total_profit": total_profit,
        },
    })))
}

/// Per-product sales view, restricted to the product's own author.
/// Admins are not exempt here, their cross-product view is the dashboard.
async fn product_analytics(
    State(state): State<AppState>,
    Staff(author): Staff,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pricing = db::products::pricing(&state.db, id)
        .await?
        .filter(|p| p.author_id == Some(author.id))
        .ok_or(ApiError::NotFound("Product not found or unauthorized"))?;

    let analytics = db::analytics::for_product(&state.db, id)
        .await?
        .unwrap_or_else(|| SalesAggregate::zeroed(id, author.id));
    let order_history = db::analytics::order_history(&state.db, pricing.id).await?;

    Ok(Json(json!({
        "analytics": analytics,
        "order_history": order_history,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SalesReportParams {
    pub year: Option<i32>,
    pub month: Option<i32>,
}

async fn sales_report(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(params): Query<SalesReportParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(month) = params.month {
        if !(1..=12).contains(&month) {
            return Err(ApiError::BadRequest("Month must be between 1 and 12".to_string()));
        }
    }
    let report = db::analytics::sales_report(&state.db, params.year, params.month).await?;
    Ok(Json(json!({ "report": report })))
}

async fn customer_analytics(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let top_customers = db::analytics::top_customers(&state.db).await?;
    let registration_trend = db::analytics::registration_trend(&state.db).await?;
    Ok(Json(json!({
        "top_customers": top_customers,
        "registration_trend": registration_trend,
    })))
}
