//! Server-side cart queries.

use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};

use crate::models::{CartItemDetail, ShirtSize};

pub async fn items(pool: &PgPool, user_id: i64) -> sqlx::Result<Vec<CartItemDetail>> {
    sqlx::query_as::<_, CartItemDetail>(
        "SELECT c.id, c.product_id, c.quantity, c.size, c.created_at,
                p.name, p.price, p.design_url, p.design_position
         FROM cart_items c
         JOIN products p ON c.product_id = p.id
         WHERE c.user_id = $1
         ORDER BY c.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Cart subtotal: Σ(price × quantity), rounded to two decimal places.
pub fn subtotal(items: &[CartItemDetail]) -> Decimal {
    items
        .iter()
        .fold(Decimal::ZERO, |acc, item| {
            acc + item.price * Decimal::from(item.quantity)
        })
        .round_dp(2)
}

/// Adds a line, merging by (product, size): an existing line's quantity is
/// incremented in the same statement, so a single add is race-free.
pub async fn upsert_line<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    product_id: i64,
    quantity: i32,
    size: ShirtSize,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO cart_items (user_id, product_id, quantity, size)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id, product_id, size)
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW()",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .bind(size)
    .execute(executor)
    .await?;
    Ok(())
}

/// Partial update of an owned line. Returns affected rows.
pub async fn update_line(
    pool: &PgPool,
    user_id: i64,
    cart_id: i64,
    quantity: Option<i32>,
    size: Option<ShirtSize>,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "UPDATE cart_items SET
             quantity = COALESCE($3, quantity),
             size = COALESCE($4, size),
             updated_at = NOW()
         WHERE id = $1 AND user_id = $2",
    )
    .bind(cart_id)
    .bind(user_id)
    .bind(quantity)
    .bind(size)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn remove_line(pool: &PgPool, user_id: i64, cart_id: i64) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(cart_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn clear<'e, E: PgExecutor<'e>>(executor: E, user_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn line(price: Decimal, quantity: i32) -> CartItemDetail {
        CartItemDetail {
            id: 1,
            product_id: 1,
            quantity,
            size: ShirtSize::M,
            name: "Vintage Rock T-Shirt".to_string(),
            price,
            design_url: None,
            design_position: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn subtotal_sums_price_times_quantity() {
        let items = vec![line(Decimal::new(2999, 2), 2), line(Decimal::new(1950, 2), 1)];
        assert_eq!(subtotal(&items), Decimal::new(7948, 2));
    }

    #[test]
    fn subtotal_of_empty_cart_is_zero() {
        assert_eq!(subtotal(&[]), Decimal::ZERO);
    }

    #[test]
    fn subtotal_rounds_to_two_decimals() {
        let items = vec![line(Decimal::new(9999, 3), 3)]; // 9.999 × 3 = 29.997
        assert_eq!(subtotal(&items), Decimal::new(3000, 2));
    }
}
