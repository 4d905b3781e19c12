//! User queries.

use sqlx::{PgConnection, PgPool};

use crate::models::{Designer, Role, User};

pub async fn find_by_id(pool: &PgPool, id: i64) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn insert(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    name: &str,
    role: Role,
) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password_hash, name, role) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(role)
    .fetch_one(pool)
    .await
}

/// Guest checkout account provisioning: insert a customer keyed by email, or
/// reuse the existing account when the email is already registered.
pub async fn find_or_create_guest(
    conn: &mut PgConnection,
    email: &str,
    name: &str,
    password_hash: &str,
) -> sqlx::Result<i64> {
    let inserted: Option<(i64,)> = sqlx::query_as(
        "INSERT INTO users (email, password_hash, name, role) VALUES ($1, $2, $3, 'customer')
         ON CONFLICT (email) DO NOTHING RETURNING id",
    )
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((id,)) = inserted {
        return Ok(id);
    }
    let (id,): (i64,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

pub struct ProfileChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub payment_method: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.zip_code.is_none()
            && self.country.is_none()
            && self.payment_method.is_none()
    }
}

pub async fn update_profile(pool: &PgPool, id: i64, changes: &ProfileChanges) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET
             name = COALESCE($2, name),
             phone = COALESCE($3, phone),
             address = COALESCE($4, address),
             city = COALESCE($5, city),
             state = COALESCE($6, state),
             zip_code = COALESCE($7, zip_code),
             country = COALESCE($8, country),
             payment_method = COALESCE($9, payment_method),
             updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&changes.name)
    .bind(&changes.phone)
    .bind(&changes.address)
    .bind(&changes.city)
    .bind(&changes.state)
    .bind(&changes.zip_code)
    .bind(&changes.country)
    .bind(&changes.payment_method)
    .fetch_optional(pool)
    .await
}

const DESIGNER_COLUMNS: &str = "id, name, email, avatar, banner, description, role, created_at";

/// Designer lookup: merchants and admins only.
pub async fn find_designer(pool: &PgPool, id: i64) -> sqlx::Result<Option<Designer>> {
    sqlx::query_as::<_, Designer>(&format!(
        "SELECT {DESIGNER_COLUMNS} FROM users WHERE id = $1 AND role IN ('merchant', 'admin')"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn update_designer_profile(
    pool: &PgPool,
    id: i64,
    description: Option<&str>,
    banner: Option<&str>,
) -> sqlx::Result<Option<Designer>> {
    sqlx::query_as::<_, Designer>(&format!(
        "UPDATE users SET
             description = COALESCE($2, description),
             banner = COALESCE($3, banner),
             updated_at = NOW()
         WHERE id = $1
         RETURNING {DESIGNER_COLUMNS}"
    ))
    .bind(id)
    .bind(description)
    .bind(banner)
    .fetch_optional(pool)
    .await
}
