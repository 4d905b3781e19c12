//! Database row types and wire enums.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// Closed set of account roles. Stored as the `user_role` enum in Postgres.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Merchant,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }

    /// Merchants and admins may author products and appear as designers.
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Merchant | Self::Admin)
    }
}

/// Shirt sizes, the `shirt_size` enum in Postgres.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shirt_size")]
pub enum ShirtSize {
    XS,
    S,
    M,
    L,
    XL,
    XXL,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// Accepted payment methods. Validated at the boundary, stored as text on the
/// user profile; orders do not record it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    Stripe,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::Paypal => "paypal",
            Self::Stripe => "stripe",
        }
    }
}

/// Placement of a design on the shirt, persisted as JSONB.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignPosition {
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub rotation: f64,
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub banner: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a user returned by register/login.
#[derive(Clone, Debug, Serialize)]
pub struct AuthUserPayload {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for AuthUserPayload {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// Full profile projection, never including the password hash.
#[derive(Clone, Debug, Serialize)]
pub struct ProfilePayload {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub payment_method: Option<String>,
}

impl From<User> for ProfilePayload {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            phone: user.phone,
            address: user.address,
            city: user.city,
            state: user.state,
            zip_code: user.zip_code,
            country: user.country,
            payment_method: user.payment_method,
        }
    }
}

/// Public designer profile (merchant or admin accounts only).
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Designer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub banner: Option<String>,
    pub description: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Product joined with its author for listings.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct ProductWithAuthor {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub base_cost: Decimal,
    pub design_url: Option<String>,
    pub design_position: Option<Json<DesignPosition>>,
    pub author_id: Option<i64>,
    pub quantity_sold: i64,
    pub total_revenue: Decimal,
    pub sizes: Json<Vec<ShirtSize>>,
    pub colors: Json<Vec<String>>,
    pub in_stock: bool,
    pub category: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
}

impl ProductWithAuthor {
    /// Fills in a deterministic placeholder avatar when the author has none.
    pub fn with_avatar_fallback(mut self) -> Self {
        if self.author_avatar.is_none() {
            self.author_avatar = Some(placeholder_avatar(self.author_name.as_deref()));
        }
        self
    }
}

/// Placeholder avatar URL seeded by the designer's name.
pub fn placeholder_avatar(name: Option<&str>) -> String {
    let seed: String = name
        .unwrap_or("Designer")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={seed}")
}

/// One line of the authenticated user's cart, joined with the product.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct CartItemDetail {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub size: ShirtSize,
    pub name: String,
    pub price: Decimal,
    pub design_url: Option<String>,
    pub design_position: Option<Json<DesignPosition>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Frozen order line joined with product display fields.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct OrderItemDetail {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub size: ShirtSize,
    pub price_per_unit: Decimal,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub design_url: Option<String>,
    pub design_position: Option<Json<DesignPosition>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub item_count: usize,
    pub items: Vec<OrderItemDetail>,
}

/// Admin listing row: order plus customer identity and line count.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct AdminOrderSummary {
    pub id: i64,
    pub user_id: i64,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub item_count: i64,
}

/// Running per-product/per-author sales counters. Not an authoritative ledger.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct SalesAggregate {
    pub id: i64,
    pub product_id: i64,
    pub author_id: i64,
    pub quantity_sold: i64,
    pub total_revenue: Decimal,
    pub total_profit: Decimal,
    pub last_sale_date: Option<DateTime<Utc>>,
}

impl SalesAggregate {
    /// Placeholder for a product that has not sold yet.
    pub fn zeroed(product_id: i64, author_id: i64) -> Self {
        Self {
            id: 0,
            product_id,
            author_id,
            quantity_sold: 0,
            total_revenue: Decimal::ZERO,
            total_profit: Decimal::ZERO,
            last_sale_date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_format_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Merchant).unwrap(), "\"merchant\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert!(role.is_admin() && role.is_staff());
        assert!(!Role::Customer.is_staff());
    }

    #[test]
    fn shirt_size_round_trips() {
        for (size, wire) in [(ShirtSize::XS, "\"XS\""), (ShirtSize::XXL, "\"XXL\"")] {
            assert_eq!(serde_json::to_string(&size).unwrap(), wire);
            assert_eq!(serde_json::from_str::<ShirtSize>(wire).unwrap(), size);
        }
        assert!(serde_json::from_str::<ShirtSize>("\"XXXL\"").is_err());
    }

    #[test]
    fn payment_method_uses_snake_case() {
        let method: PaymentMethod = serde_json::from_str("\"credit_card\"").unwrap();
        assert_eq!(method, PaymentMethod::CreditCard);
        assert_eq!(method.as_str(), "credit_card");
    }

    #[test]
    fn design_position_defaults_scale_and_rotation() {
        let pos: DesignPosition = serde_json::from_str(r#"{"x": 0.5, "y": 0.25}"#).unwrap();
        assert_eq!(pos.scale, 1.0);
        assert_eq!(pos.rotation, 0.0);
    }

    #[test]
    fn placeholder_avatar_is_seeded_by_name() {
        let url = placeholder_avatar(Some("Jane Doe"));
        assert!(url.contains("seed=Jane-Doe"));
        assert!(placeholder_avatar(None).contains("seed=Designer"));
    }
}
