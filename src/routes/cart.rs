//! Server-side cart for signed-in customers.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::auth::Customer;
use crate::db;
use crate::error::ApiError;
use crate::models::ShirtSize;
use crate::routes::AppJson;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/add", post(add_item))
        .route("/update/:cart_id", put(update_item))
        .route("/remove/:cart_id", delete(remove_item))
        .route("/merge", post(merge_cart))
}

/// Cart payload shared by every cart endpoint. Shipping is free, so the
/// total equals the subtotal.
async fn cart_payload(pool: &PgPool, user_id: i64) -> Result<serde_json::Value, ApiError> {
    let items = db::cart::items(pool, user_id).await?;
    let subtotal = db::cart::subtotal(&items);
    Ok(json!({
        "items": items,
        "subtotal": subtotal,
        "total": subtotal,
    }))
}

async fn get_cart(
    State(state): State<AppState>,
    Customer(user): Customer,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(cart_payload(&state.db, user.id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1, max = 10))]
    pub quantity: i32,
    pub size: ShirtSize,
}

async fn add_item(
    State(state): State<AppState>,
    Customer(user): Customer,
    AppJson(payload): AppJson<AddItemRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    payload.validate()?;
    if !db::products::exists_active(&state.db, payload.product_id).await? {
        return Err(ApiError::NotFound("Product not found"));
    }

    db::cart::upsert_line(
        &state.db,
        user.id,
        payload.product_id,
        payload.quantity,
        payload.size,
    )
    .await?;

    let mut payload = cart_payload(&state.db, user.id).await?;
    payload["message"] = json!("Item added to cart");
    Ok(Json(payload))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(min = 1, max = 10))]
    pub quantity: Option<i32>,
    pub size: Option<ShirtSize>,
}

async fn update_item(
    State(state): State<AppState>,
    Customer(user): Customer,
    Path(cart_id): Path<i64>,
    AppJson(payload): AppJson<UpdateItemRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    payload.validate()?;
    if payload.quantity.is_none() && payload.size.is_none() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let affected =
        db::cart::update_line(&state.db, user.id, cart_id, payload.quantity, payload.size).await?;
    if affected == 0 {
        return Err(ApiError::NotFound("Cart item not found"));
    }

    let mut payload = cart_payload(&state.db, user.id).await?;
    payload["message"] = json!("Cart item updated");
    Ok(Json(payload))
}

async fn remove_item(
    State(state): State<AppState>,
    Customer(user): Customer,
    Path(cart_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let affected = db::cart::remove_line(&state.db, user.id, cart_id).await?;
    if affected == 0 {
        return Err(ApiError::NotFound("Cart item not found"));
    }

    let mut payload = cart_payload(&state.db, user.id).await?;
    payload["message"] = json!("Item removed from cart");
    Ok(Json(payload))
}

async fn clear_cart(
    State(state): State<AppState>,
    Customer(user): Customer,
) -> Result<Json<serde_json::Value>, ApiError> {
    db::cart::clear(&state.db, user.id).await?;
    Ok(Json(json!({ "message": "Cart cleared" })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct MergeLine {
    pub product_id: i64,
    #[validate(range(min = 1, max = 10))]
    pub quantity: i32,
    pub size: ShirtSize,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MergeRequest {
    #[validate]
    pub items: Vec<MergeLine>,
}

/// Merges lines one at a time. A line that fails for any reason, unknown or
/// inactive product included, is logged and skipped so the rest of the cart
/// still merges.
async fn merge_lines(pool: &PgPool, user_id: i64, lines: &[MergeLine]) {
    for line in lines {
        match db::products::exists_active(pool, line.product_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    user_id,
                    product_id = line.product_id,
                    "skipping merge line for unknown product"
                );
                continue;
            }
            Err(err) => {
                tracing::warn!(
                    user_id,
                    product_id = line.product_id,
                    error = %err,
                    "skipping merge line, product lookup failed"
                );
                continue;
            }
        }
        if let Err(err) =
            db::cart::upsert_line(pool, user_id, line.product_id, line.quantity, line.size).await
        {
            tracing::warn!(
                user_id,
                product_id = line.product_id,
                error = %err,
                "failed to merge cart line"
            );
        }
    }
}

/// Folds a locally kept cart into the server cart after login. Quantities
/// for matching (product, size) lines are added together.
async fn merge_cart(
    State(state): State<AppState>,
    Customer(user): Customer,
    AppJson(payload): AppJson<MergeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    payload.validate()?;

    merge_lines(&state.db, user.id, &payload.items).await;

    let mut payload = cart_payload(&state.db, user.id).await?;
    payload["message"] = json!("Cart merged");
    Ok(Json(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_request_rejects_out_of_range_quantity() {
        let request: AddItemRequest =
            serde_json::from_str(r#"{"product_id": 1, "quantity": 11, "size": "M"}"#).unwrap();
        assert!(request.validate().is_err());

        let request: AddItemRequest =
            serde_json::from_str(r#"{"product_id": 1, "quantity": 10, "size": "M"}"#).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn add_request_rejects_unknown_size() {
        let result: Result<AddItemRequest, _> =
            serde_json::from_str(r#"{"product_id": 1, "quantity": 1, "size": "XXXL"}"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn merge_survives_database_errors_per_line() {
        // A pool with nothing behind it makes every product lookup fail;
        // the merge must skip each line instead of aborting.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(100))
            .connect_lazy("postgres://localhost:1/unreachable")
            .unwrap();
        let lines = vec![
            MergeLine {
                product_id: 1,
                quantity: 2,
                size: ShirtSize::M,
            },
            MergeLine {
                product_id: 2,
                quantity: 1,
                size: ShirtSize::L,
            },
        ];
        merge_lines(&pool, 1, &lines).await;
    }

    #[test]
    fn merge_request_validates_nested_lines() {
        let request: MergeRequest = serde_json::from_str(
            r#"{"items": [
                {"product_id": 1, "quantity": 2, "size": "S"},
                {"product_id": 2, "quantity": 0, "size": "L"}
            ]}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }
}
