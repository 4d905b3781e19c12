//! Checkout and order tracking.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{self, AdminUser, AuthUser, MaybeUser};
use crate::db::{self, orders::ResolvedLine};
use crate::error::ApiError;
use crate::events;
use crate::models::{OrderStatus, PaymentMethod, PaymentStatus, Role, ShirtSize};
use crate::routes::AppJson;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/admin/all", get(admin_list))
        .route("/admin/stats", get(admin_stats))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_status))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutLine {
    pub product_id: i64,
    #[validate(range(min = 1, max = 10))]
    pub quantity: i32,
    pub size: ShirtSize,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 10))]
    pub shipping_address: String,
    /// Required for guest checkout, ignored for signed-in customers.
    #[validate]
    pub cart_items: Option<Vec<CheckoutLine>>,
    /// Must name one of the accepted methods. Not persisted on the order;
    /// payment capture is an external concern.
    pub payment_method: PaymentMethod,
    #[validate(email)]
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// Prices client-supplied lines against the catalog. Rejects the whole
/// checkout when any product is missing.
async fn resolve_lines(
    state: &AppState,
    lines: &[CheckoutLine],
) -> Result<Vec<ResolvedLine>, ApiError> {
    let mut resolved = Vec::with_capacity(lines.len());
    for line in lines {
        let pricing = db::products::pricing(&state.db, line.product_id)
            .await?
            .ok_or_else(|| {
                ApiError::BadRequest(format!("Product {} not found", line.product_id))
            })?;
        resolved.push(ResolvedLine {
            product_id: pricing.id,
            quantity: line.quantity,
            size: line.size,
            price: pricing.price,
            base_cost: pricing.base_cost,
            author_id: pricing.author_id,
        });
    }
    Ok(resolved)
}

async fn create_order(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let customer = user.filter(|user| user.role == Role::Customer);
    let (user_id, lines, clear_cart) = match customer {
        Some(customer) => {
            let lines = db::orders::server_cart_lines(&state.db, customer.id).await?;
            (customer.id, lines, true)
        }
        None => {
            let client_lines = payload
                .cart_items
                .as_deref()
                .filter(|lines| !lines.is_empty())
                .ok_or_else(|| ApiError::BadRequest("Cart is empty".to_string()))?;
            let email = payload
                .email
                .as_deref()
                .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?;
            let full_name = payload
                .full_name
                .as_deref()
                .ok_or_else(|| ApiError::BadRequest("Full name is required".to_string()))?;

            let lines = resolve_lines(&state, client_lines).await?;
            // Guest accounts get a throwaway password so a later password
            // reset can claim the account.
            let password_hash = auth::hash_password(&Uuid::new_v4().to_string())?;
            let mut conn = state.db.acquire().await?;
            let user_id =
                db::users::find_or_create_guest(&mut conn, email, full_name, &password_hash)
                    .await?;
            (user_id, lines, false)
        }
    };

    if lines.is_empty() {
        return Err(ApiError::BadRequest("Cart is empty".to_string()));
    }

    let (order_id, total_amount) = db::orders::place(
        &state.db,
        user_id,
        &lines,
        payload.shipping_address.trim(),
        clear_cart,
    )
    .await?;
    tracing::info!(order_id, user_id, %total_amount, "order placed");

    let item_count: i64 = lines.iter().map(|line| i64::from(line.quantity)).sum();
    events::publish_order_placed(&state.nats, order_id, user_id, total_amount, item_count).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Order placed successfully",
            "orderId": order_id,
            "total_amount": total_amount,
        })),
    ))
}

async fn list_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let orders = db::orders::list_for_user(&state.db, user.id).await?;
    Ok(Json(json!({ "orders": orders })))
}

async fn get_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (order, items) = db::orders::get_for_user(&state.db, user.id, id)
        .await?
        .ok_or(ApiError::NotFound("Order not found"))?;
    let order = crate::models::OrderWithItems {
        item_count: items.len(),
        items,
        order,
    };
    Ok(Json(json!({ "order": order })))
}

#[derive(Debug, Deserialize)]
pub struct AdminListParams {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn admin_list(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(params): Query<AdminListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0).max(0);
    let orders = db::orders::admin_list(&state.db, params.status, limit, offset).await?;
    Ok(Json(json!({ "orders": orders })))
}

async fn admin_stats(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = db::orders::stats(&state.db).await?;
    Ok(Json(json!({ "stats": stats })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub payment_status: Option<PaymentStatus>,
}

async fn update_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let affected =
        db::orders::update_status(&state.db, id, payload.status, payload.payment_status).await?;
    if affected == 0 {
        return Err(ApiError::NotFound("Order not found"));
    }
    tracing::info!(order_id = id, status = ?payload.status, "order status updated");
    Ok(Json(json!({ "message": "Order status updated" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_requires_a_full_shipping_address() {
        let request: CreateOrderRequest = serde_json::from_str(
            r#"{"shipping_address": "short", "payment_method": "paypal"}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn checkout_requires_a_payment_method() {
        let missing: Result<CreateOrderRequest, _> =
            serde_json::from_str(r#"{"shipping_address": "221B Baker Street, London"}"#);
        assert!(missing.is_err());

        let unknown: Result<CreateOrderRequest, _> = serde_json::from_str(
            r#"{"shipping_address": "221B Baker Street, London", "payment_method": "cheque"}"#,
        );
        assert!(unknown.is_err());
    }

    #[test]
    fn checkout_validates_guest_email() {
        let request: CreateOrderRequest = serde_json::from_str(
            r#"{
                "shipping_address": "221B Baker Street, London",
                "payment_method": "stripe",
                "email": "not-an-email"
            }"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn checkout_accepts_guest_payload() {
        let request: CreateOrderRequest = serde_json::from_str(
            r#"{
                "shipping_address": "221B Baker Street, London",
                "email": "guest@example.com",
                "full_name": "Guest Shopper",
                "payment_method": "credit_card",
                "cart_items": [{"product_id": 1, "quantity": 2, "size": "M"}]
            }"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.payment_method, PaymentMethod::CreditCard);
        assert_eq!(request.cart_items.unwrap().len(), 1);
    }
}
