//! Product catalog queries.

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::{DesignPosition, ProductWithAuthor, ShirtSize};

const PRODUCT_WITH_AUTHOR: &str = "SELECT p.*, u.name AS author_name, u.avatar AS author_avatar
     FROM products p
     LEFT JOIN users u ON p.author_id = u.id";

#[derive(Debug, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Storefront listing: active, in-stock products, newest first.
pub async fn list(pool: &PgPool, filter: &ProductFilter) -> sqlx::Result<Vec<ProductWithAuthor>> {
    sqlx::query_as::<_, ProductWithAuthor>(&format!(
        "{PRODUCT_WITH_AUTHOR}
         WHERE p.in_stock AND p.is_active
           AND ($1::text IS NULL OR p.category = $1)
           AND ($2::text IS NULL
                OR p.name ILIKE '%' || $2 || '%'
                OR p.description ILIKE '%' || $2 || '%'
                OR u.name ILIKE '%' || $2 || '%')
         ORDER BY p.created_at DESC
         LIMIT $3 OFFSET $4"
    ))
    .bind(&filter.category)
    .bind(&filter.search)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await
}

/// Substring search over name, description, and author name. Returns the
/// matching page and the total match count before pagination.
pub async fn search(
    pool: &PgPool,
    query: &str,
    category: Option<&str>,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<ProductWithAuthor>, i64)> {
    let predicate = "p.in_stock
           AND ($2::text IS NULL OR p.category = $2)
           AND (p.name ILIKE '%' || $1 || '%'
                OR p.description ILIKE '%' || $1 || '%'
                OR u.name ILIKE '%' || $1 || '%')";

    let products = sqlx::query_as::<_, ProductWithAuthor>(&format!(
        "{PRODUCT_WITH_AUTHOR}
         WHERE {predicate}
         ORDER BY p.quantity_sold DESC, p.created_at DESC
         LIMIT $3 OFFSET $4"
    ))
    .bind(query)
    .bind(category)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM products p LEFT JOIN users u ON p.author_id = u.id WHERE {predicate}"
    ))
    .bind(query)
    .bind(category)
    .fetch_one(pool)
    .await?;

    Ok((products, total))
}

/// Top 8 products by quantity sold over the last 7 days of meaningful orders.
pub async fn hot(pool: &PgPool) -> sqlx::Result<Vec<ProductWithAuthor>> {
    sqlx::query_as::<_, ProductWithAuthor>(&format!(
        "{PRODUCT_WITH_AUTHOR}
         LEFT JOIN (
             SELECT oi.product_id, SUM(oi.quantity) AS qty
             FROM order_items oi
             JOIN orders o ON oi.order_id = o.id
             WHERE o.created_at >= NOW() - INTERVAL '7 days'
               AND o.status IN ('processing', 'shipped', 'delivered')
             GROUP BY oi.product_id
         ) recent ON recent.product_id = p.id
         WHERE p.in_stock
         ORDER BY recent.qty DESC NULLS LAST, p.quantity_sold DESC, p.created_at DESC
         LIMIT 8"
    ))
    .fetch_all(pool)
    .await
}

/// Products sharing a category or author with the user's past orders,
/// excluding anything already purchased.
pub async fn recommended(pool: &PgPool, user_id: i64) -> sqlx::Result<Vec<ProductWithAuthor>> {
    sqlx::query_as::<_, ProductWithAuthor>(&format!(
        "{PRODUCT_WITH_AUTHOR}
         WHERE p.in_stock AND p.is_active
           AND p.id NOT IN (
               SELECT oi.product_id FROM order_items oi
               JOIN orders o ON oi.order_id = o.id
               WHERE o.user_id = $1)
           AND (
               p.category IN (
                   SELECT DISTINCT p2.category FROM products p2
                   JOIN order_items oi2 ON p2.id = oi2.product_id
                   JOIN orders o2 ON oi2.order_id = o2.id
                   WHERE o2.user_id = $1
                     AND o2.status IN ('processing', 'shipped', 'delivered'))
               OR p.author_id IN (
                   SELECT DISTINCT p3.author_id FROM products p3
                   JOIN order_items oi3 ON p3.id = oi3.product_id
                   JOIN orders o3 ON oi3.order_id = o3.id
                   WHERE o3.user_id = $1
                     AND o3.status IN ('processing', 'shipped', 'delivered')
                     AND p3.author_id IS NOT NULL))
         ORDER BY random()
         LIMIT 12"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get(pool: &PgPool, id: i64) -> sqlx::Result<Option<ProductWithAuthor>> {
    sqlx::query_as::<_, ProductWithAuthor>(&format!(
        "{PRODUCT_WITH_AUTHOR} WHERE p.id = $1 AND p.in_stock"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn by_author(pool: &PgPool, author_id: i64) -> sqlx::Result<Vec<ProductWithAuthor>> {
    sqlx::query_as::<_, ProductWithAuthor>(&format!(
        "{PRODUCT_WITH_AUTHOR}
         WHERE p.author_id = $1 AND p.in_stock
         ORDER BY p.created_at DESC"
    ))
    .bind(author_id)
    .fetch_all(pool)
    .await
}

/// Pricing fields needed to resolve an order line. No stock filter: an order
/// freezes whatever the product costs at conversion time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductPricing {
    pub id: i64,
    pub price: Decimal,
    pub base_cost: Decimal,
    pub author_id: Option<i64>,
}

pub async fn pricing(pool: &PgPool, id: i64) -> sqlx::Result<Option<ProductPricing>> {
    sqlx::query_as::<_, ProductPricing>(
        "SELECT id, price, base_cost, author_id FROM products WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn exists_active(pool: &PgPool, id: i64) -> sqlx::Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub base_cost: Decimal,
    pub category: String,
    pub design_url: Option<String>,
    pub design_position: Option<DesignPosition>,
    pub sizes: Option<Vec<ShirtSize>>,
    pub colors: Option<Vec<String>>,
}

/// Creates the product and its zeroed sales aggregate in one transaction.
pub async fn create(pool: &PgPool, author_id: i64, product: &NewProduct) -> sqlx::Result<i64> {
    let mut tx = pool.begin().await?;

    let (product_id,): (i64,) = sqlx::query_as(
        "INSERT INTO products
             (name, description, price, base_cost, category, design_url, design_position,
              sizes, colors, author_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7,
                 COALESCE($8, '[\"XS\",\"S\",\"M\",\"L\",\"XL\",\"XXL\"]'::jsonb),
                 COALESCE($9, '[]'::jsonb), $10)
         RETURNING id",
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.base_cost)
    .bind(&product.category)
    .bind(&product.design_url)
    .bind(product.design_position.as_ref().map(Json))
    .bind(product.sizes.as_ref().map(Json))
    .bind(product.colors.as_ref().map(Json))
    .bind(author_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO sales_analytics (product_id, author_id) VALUES ($1, $2)")
        .bind(product_id)
        .bind(author_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(product_id)
}

#[derive(Debug, Default)]
pub struct ProductChanges {
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

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.base_cost.is_none()
            && self.category.is_none()
            && self.design_url.is_none()
            && self.design_position.is_none()
            && self.sizes.is_none()
            && self.colors.is_none()
            && self.in_stock.is_none()
            && self.is_active.is_none()
    }
}

/// Partial update, restricted to the owning author. Returns affected rows.
pub async fn update(
    pool: &PgPool,
    id: i64,
    author_id: i64,
    changes: &ProductChanges,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "UPDATE products SET
             name = COALESCE($3, name),
             description = COALESCE($4, description),
             price = COALESCE($5, price),
             base_cost = COALESCE($6, base_cost),
             category = COALESCE($7, category),
             design_url = COALESCE($8, design_url),
             design_position = COALESCE($9, design_position),
             sizes = COALESCE($10, sizes),
             colors = COALESCE($11, colors),
             in_stock = COALESCE($12, in_stock),
             is_active = COALESCE($13, is_active),
             updated_at = NOW()
         WHERE id = $1 AND author_id = $2",
    )
    .bind(id)
    .bind(author_id)
    .bind(&changes.name)
    .bind(&changes.description)
    .bind(changes.price)
    .bind(changes.base_cost)
    .bind(&changes.category)
    .bind(&changes.design_url)
    .bind(changes.design_position.as_ref().map(Json))
    .bind(changes.sizes.as_ref().map(Json))
    .bind(changes.colors.as_ref().map(Json))
    .bind(changes.in_stock)
    .bind(changes.is_active)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Delete, restricted to the owning author. Returns affected rows.
pub async fn delete(pool: &PgPool, id: i64, author_id: i64) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1 AND author_id = $2")
        .bind(id)
        .bind(author_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
