//! Product catalog and authoring.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::auth::{MaybeUser, Staff};
use crate::db::{self, products::ProductFilter};
use crate::error::ApiError;
use crate::models::{DesignPosition, ProductWithAuthor, ShirtSize};
use crate::routes::AppJson;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/search", get(search))
        .route("/hot", get(hot))
        .route("/recommended", get(recommended))
        .route("/:id", get(get_one).put(update).delete(delete))
}

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        offset.unwrap_or(0).max(0),
    )
}

fn with_avatars(products: Vec<ProductWithAuthor>) -> Vec<ProductWithAuthor> {
    products
        .into_iter()
        .map(ProductWithAuthor::with_avatar_fallback)
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (limit, offset) = page(params.limit, params.offset);
    let filter = ProductFilter {
        category: params.category,
        search: params.search,
        limit,
        offset,
    };
    let products = db::products::list(&state.db, &filter).await?;
    Ok(Json(json!({ "products": with_avatars(products) })))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Search query is required".to_string()))?;

    let (limit, offset) = page(params.limit, params.offset);
    let (products, total) =
        db::products::search(&state.db, query, params.category.as_deref(), limit, offset).await?;

    Ok(Json(json!({
        "products": with_avatars(products),
        "query": query,
        "total": total,
        "limit": limit,
        "offset": offset,
    })))
}

async fn hot(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let products = db::products::hot(&state.db).await?;
    Ok(Json(json!({ "products": with_avatars(products) })))
}

/// Personalized picks. Anonymous callers and callers with no order history
/// get an empty list.
async fn recommended(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let products = match user {
        Some(user) => db::products::recommended(&state.db, user.id).await?,
        None => Vec::new(),
    };
    Ok(Json(json!({ "products": with_avatars(products) })))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let product = db::products::get(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Product not found"))?;
    Ok(Json(json!({ "product": product.with_avatar_fallback() })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub base_cost: Option<Decimal>,
    pub category: Option<String>,
    pub design_url: Option<String>,
    pub design_position: Option<DesignPosition>,
    pub sizes: Option<Vec<ShirtSize>>,
    pub colors: Option<Vec<String>>,
}

fn check_non_negative(field: &'static str, value: Decimal) -> Result<(), ApiError> {
    if value < Decimal::ZERO {
        return Err(ApiError::BadRequest(format!("{field} must not be negative")));
    }
    Ok(())
}

async fn create(
    State(state): State<AppState>,
    Staff(author): Staff,
    AppJson(payload): AppJson<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    check_non_negative("price", payload.price)?;
    if let Some(base_cost) = payload.base_cost {
        check_non_negative("base_cost", base_cost)?;
    }

    let product = db::products::NewProduct {
        name: payload.name,
        description: payload.description,
        price: payload.price,
        base_cost: payload.base_cost.unwrap_or_else(|| Decimal::new(1500, 2)),
        category: payload.category.unwrap_or_else(|| "general".to_string()),
        design_url: payload.design_url,
        design_position: payload.design_position,
        sizes: payload.sizes,
        colors: payload.colors,
    };
    let product_id = db::products::create(&state.db, author.id, &product).await?;
    tracing::info!(product_id, author_id = author.id, "product created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Product created successfully",
            "productId": product_id,
        })),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub base_cost: Option<Decimal>,
    pub category: Option<String>,
    pub design_url: Option<String>,
    pub design_position: Option<DesignPosition>,
    pub sizes: Option<Vec<ShirtSize>>,
    pub colors: Option<Vec<String>>,
    pub in_stock: Option<bool>,
    pub is_active: Option<bool>,
}

async fn update(
    State(state): State<AppState>,
    Staff(author): Staff,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateProductRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    payload.validate()?;
    if let Some(price) = payload.price {
        check_non_negative("price", price)?;
    }
    if let Some(base_cost) = payload.base_cost {
        check_non_negative("base_cost", base_cost)?;
    }

    let changes = db::products::ProductChanges {
        name: payload.name,
        description: payload.description,
        price: payload.price,
        base_cost: payload.base_cost,
        category: payload.category,
        design_url: payload.design_url,
        design_position: payload.design_position,
        sizes: payload.sizes,
        colors: payload.colors,
        in_stock: payload.in_stock,
        is_active: payload.is_active,
    };
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let affected = db::products::update(&state.db, id, author.id, &changes).await?;
    if affected == 0 {
        return Err(ApiError::NotFound("Product not found or unauthorized"));
    }
    Ok(Json(json!({ "message": "Product updated successfully" })))
}

async fn delete(
    State(state): State<AppState>,
    Staff(author): Staff,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let affected = db::products::delete(&state.db, id, author.id).await?;
    if affected == 0 {
        return Err(ApiError::NotFound("Product not found or unauthorized"));
    }
    tracing::info!(product_id = id, author_id = author.id, "product deleted");
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_limit_and_offset() {
        assert_eq!(page(None, None), (20, 0));
        assert_eq!(page(Some(500), Some(-3)), (100, 0));
        assert_eq!(page(Some(0), Some(40)), (1, 40));
    }

    #[test]
    fn create_request_requires_a_name() {
        let request: CreateProductRequest = serde_json::from_str(
            r#"{"name": "", "price": 29.99}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn create_request_parses_typed_fields() {
        let request: CreateProductRequest = serde_json::from_str(
            r#"{
                "name": "Vintage Rock T-Shirt",
                "price": 29.99,
                "sizes": ["S", "M", "L"],
                "design_position": {"x": 0.5, "y": 0.3}
            }"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.sizes.as_deref(), Some(&[ShirtSize::S, ShirtSize::M, ShirtSize::L][..]));
        assert!(check_non_negative("price", request.price).is_ok());
        assert!(check_non_negative("price", Decimal::new(-1, 0)).is_err());
    }
}
