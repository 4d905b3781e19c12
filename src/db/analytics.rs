//! Sales aggregate upsert and back-office reporting queries.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};

use crate::models::SalesAggregate;

/// Additive upsert keyed by (product, author). There is no correction path:
/// cancelling an order does not decrement these counters.
pub async fn apply_sale<'e, E: PgExecutor<'e>>(
    executor: E,
    product_id: i64,
    author_id: i64,
    quantity: i32,
    revenue: Decimal,
    profit: Decimal,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO sales_analytics
             (product_id, author_id, quantity_sold, total_revenue, total_profit, last_sale_date)
         VALUES ($1, $2, $3, $4, $5, NOW())
         ON CONFLICT (product_id, author_id) DO UPDATE SET
             quantity_sold = sales_analytics.quantity_sold + EXCLUDED.quantity_sold,
             total_revenue = sales_analytics.total_revenue + EXCLUDED.total_revenue,
             total_profit = sales_analytics.total_profit + EXCLUDED.total_profit,
             last_sale_date = NOW(),
             updated_at = NOW()",
    )
    .bind(product_id)
    .bind(author_id)
    .bind(i64::from(quantity))
    .bind(revenue)
    .bind(profit)
    .execute(executor)
    .await?;
    Ok(())
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RecentSale {
    pub product_id: i64,
    pub author_id: i64,
    pub quantity_sold: i64,
    pub total_revenue: Decimal,
    pub total_profit: Decimal,
    pub last_sale_date: Option<DateTime<Utc>>,
    pub product_name: String,
    pub author_name: String,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub name: String,
    pub quantity_sold: i64,
    pub total_revenue: Decimal,
    pub total_profit: Decimal,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total_products: i64,
    pub total_customers: i64,
    pub total_revenue: Decimal,
    pub total_profit: Decimal,
    pub recent_sales: Vec<RecentSale>,
    pub top_products: Vec<TopProduct>,
}

pub async fn dashboard(pool: &PgPool) -> sqlx::Result<Dashboard> {
    let (total_products,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM products WHERE is_active")
            .fetch_one(pool)
            .await?;

    let (total_customers,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'customer'")
            .fetch_one(pool)
            .await?;

    let (total_revenue,): (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE payment_status = 'paid'",
    )
    .fetch_one(pool)
    .await?;

    let (total_profit,): (Decimal,) =
        sqlx::query_as("SELECT COALESCE(SUM(total_profit), 0) FROM sales_analytics")
            .fetch_one(pool)
            .await?;

    let recent_sales: Vec<RecentSale> = sqlx::query_as(
        "SELECT sa.product_id, sa.author_id, sa.quantity_sold, sa.total_revenue,
                sa.total_profit, sa.last_sale_date,
                p.name AS product_name, u.name AS author_name
         FROM sales_analytics sa
         JOIN products p ON sa.product_id = p.id
         JOIN users u ON sa.author_id = u.id
         ORDER BY sa.last_sale_date DESC NULLS LAST
         LIMIT 10",
    )
    .fetch_all(pool)
    .await?;

    let top_products: Vec<TopProduct> = sqlx::query_as(
        "SELECT p.name, sa.quantity_sold, sa.total_revenue, sa.total_profit
         FROM sales_analytics sa
         JOIN products p ON sa.product_id = p.id
         ORDER BY sa.quantity_sold DESC
         LIMIT 5",
    )
    .fetch_all(pool)
    .await?;

    Ok(Dashboard {
        total_products,
        total_customers,
        total_revenue,
        total_profit,
        recent_sales,
        top_products,
    })
}

/// A merchant's product joined with its running sales counters.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProductSales {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub base_cost: Decimal,
    pub design_url: Option<String>,
    pub category: String,
    pub in_stock: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub quantity_sold: i64,
    pub total_revenue: Decimal,
    pub total_profit: Decimal,
    pub last_sale_date: Option<DateTime<Utc>>,
}

pub async fn products_with_sales(pool: &PgPool, author_id: i64) -> sqlx::Result<Vec<ProductSales>> {
    sqlx::query_as::<_, ProductSales>(
        "SELECT p.id, p.name, p.price, p.base_cost, p.design_url, p.category,
                p.in_stock, p.is_active, p.created_at,
                COALESCE(sa.quantity_sold, 0) AS quantity_sold,
                COALESCE(sa.total_revenue, 0) AS total_revenue,
                COALESCE(sa.total_profit, 0) AS total_profit,
                sa.last_sale_date
         FROM products p
         LEFT JOIN sales_analytics sa
             ON p.id = sa.product_id AND sa.author_id = p.author_id
         WHERE p.author_id = $1
         ORDER BY p.created_at DESC",
    )
    .bind(author_id)
    .fetch_all(pool)
    .await
}

pub async fn for_product(pool: &PgPool, product_id: i64) -> sqlx::Result<Option<SalesAggregate>> {
    sqlx::query_as::<_, SalesAggregate>(
        "SELECT id, product_id, author_id, quantity_sold, total_revenue, total_profit,
                last_sale_date
         FROM sales_analytics WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await
}

/// Every order line that touched a product, for the author's drill-down view.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProductOrderHistory {
    pub order_id: i64,
    pub quantity: i32,
    pub price_per_unit: Decimal,
    pub total_price: Decimal,
    pub order_date: DateTime<Utc>,
    pub status: crate::models::OrderStatus,
    pub customer_name: String,
}

pub async fn order_history(pool: &PgPool, product_id: i64) -> sqlx::Result<Vec<ProductOrderHistory>> {
    sqlx::query_as::<_, ProductOrderHistory>(
        "SELECT oi.order_id, oi.quantity, oi.price_per_unit, oi.total_price,
                o.created_at AS order_date, o.status, u.name AS customer_name
         FROM order_items oi
         JOIN orders o ON oi.order_id = o.id
         JOIN users u ON o.user_id = u.id
         WHERE oi.product_id = $1
         ORDER BY o.created_at DESC",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DailySales {
    pub sale_date: NaiveDate,
    pub orders_count: i64,
    pub items_sold: i64,
    pub daily_revenue: Decimal,
    pub daily_profit: Decimal,
}

/// Per-day order volume, revenue, and profit, optionally filtered to a month.
pub async fn sales_report(
    pool: &PgPool,
    year: Option<i32>,
    month: Option<i32>,
) -> sqlx::Result<Vec<DailySales>> {
    sqlx::query_as::<_, DailySales>(
        "SELECT DATE(o.created_at) AS sale_date,
                COUNT(DISTINCT o.id) AS orders_count,
                COALESCE(SUM(oi.quantity), 0) AS items_sold,
                COALESCE(SUM(oi.total_price), 0) AS daily_revenue,
                COALESCE(SUM(oi.total_price - p.base_cost * oi.quantity), 0) AS daily_profit
         FROM orders o
         JOIN order_items oi ON o.id = oi.order_id
         JOIN products p ON oi.product_id = p.id
         WHERE ($1::int IS NULL OR EXTRACT(YEAR FROM o.created_at) = $1)
           AND ($2::int IS NULL OR EXTRACT(MONTH FROM o.created_at) = $2)
         GROUP BY DATE(o.created_at)
         ORDER BY sale_date DESC",
    )
    .bind(year)
    .bind(month)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopCustomer {
    pub name: String,
    pub email: String,
    pub order_count: i64,
    pub total_spent: Decimal,
}

pub async fn top_customers(pool: &PgPool) -> sqlx::Result<Vec<TopCustomer>> {
    sqlx::query_as::<_, TopCustomer>(
        "SELECT u.name, u.email, COUNT(o.id) AS order_count,
                COALESCE(SUM(o.total_amount), 0) AS total_spent
         FROM users u
         JOIN orders o ON u.id = o.user_id
         WHERE u.role = 'customer'
         GROUP BY u.id
         ORDER BY total_spent DESC
         LIMIT 10",
    )
    .fetch_all(pool)
    .await
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RegistrationDay {
    pub reg_date: NaiveDate,
    pub new_customers: i64,
}

pub async fn registration_trend(pool: &PgPool) -> sqlx::Result<Vec<RegistrationDay>> {
    sqlx::query_as::<_, RegistrationDay>(
        "SELECT DATE(created_at) AS reg_date, COUNT(*) AS new_customers
         FROM users
         WHERE role = 'customer'
         GROUP BY DATE(created_at)
         ORDER BY reg_date DESC
         LIMIT 30",
    )
    .fetch_all(pool)
    .await
}
