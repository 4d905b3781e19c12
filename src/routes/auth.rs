//! Registration, login, and profile management.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::auth::{hash_password, issue_token, verify_password, AuthUser};
use crate::db;
use crate::error::ApiError;
use crate::models::{AuthUserPayload, PaymentMethod, ProfilePayload, Role, User};
use crate::routes::AppJson;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/admin/login", post(admin_login))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 2))]
    pub name: String,
}

async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    if db::users::find_by_email(&state.db, &payload.email).await?.is_some() {
        return Err(ApiError::BadRequest("User already exists".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = db::users::insert(
        &state.db,
        &payload.email,
        &password_hash,
        &payload.name,
        Role::Customer,
    )
    .await?;

    let token = issue_token(user.id, &state.config.jwt_secret)?;
    tracing::info!(user_id = user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "token": token,
            "user": AuthUserPayload::from(&user),
        })),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

async fn authenticate(state: &AppState, payload: &LoginRequest) -> Result<Option<User>, ApiError> {
    let Some(user) = db::users::find_by_email(&state.db, &payload.email).await? else {
        return Ok(None);
    };
    if verify_password(&payload.password, &user.password_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    payload.validate()?;

    let user = authenticate(&state, &payload)
        .await?
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    let token = issue_token(user.id, &state.config.jwt_secret)?;
    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": AuthUserPayload::from(&user),
    })))
}

async fn admin_login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    payload.validate()?;

    let user = authenticate(&state, &payload)
        .await?
        .filter(|user| user.role.is_admin())
        .ok_or(ApiError::Unauthorized("Invalid admin credentials"))?;

    let token = issue_token(user.id, &state.config.jwt_secret)?;
    Ok(Json(json!({
        "message": "Admin login successful",
        "token": token,
        "user": AuthUserPayload::from(&user),
    })))
}

async fn me(AuthUser(user): AuthUser) -> Json<serde_json::Value> {
    Json(json!({ "user": ProfilePayload::from(user) }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    payload.validate()?;

    let changes = db::users::ProfileChanges {
        name: payload.name,
        phone: payload.phone,
        address: payload.address,
        city: payload.city,
        state: payload.state,
        zip_code: payload.zip_code,
        country: payload.country,
        payment_method: payload.payment_method.map(|m| m.as_str().to_string()),
    };
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let updated = db::users::update_profile(&state.db, user.id, &changes)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": ProfilePayload::from(updated),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_rejects_bad_email_and_short_password() {
        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
            name: "Jane".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            email: "jane@example.com".to_string(),
            password: "short".to_string(),
            name: "Jane".to_string(),
        };
        assert!(short_password.validate().is_err());

        let ok = RegisterRequest {
            email: "jane@example.com".to_string(),
            password: "secret1".to_string(),
            name: "Jane".to_string(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn profile_update_validates_only_present_fields() {
        let empty = UpdateProfileRequest {
            name: None,
            phone: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            country: None,
            payment_method: None,
        };
        assert!(empty.validate().is_ok());

        let short_name = UpdateProfileRequest {
            name: Some("J".to_string()),
            ..empty
        };
        assert!(short_name.validate().is_err());
    }
}
