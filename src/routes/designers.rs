//! Public designer storefronts.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::models::{placeholder_avatar, ProductWithAuthor};
use crate::routes::AppJson;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_designer))
        .route("/:id/profile", put(update_profile))
}

async fn get_designer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut designer = db::users::find_designer(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Designer not found"))?;
    if designer.avatar.is_none() {
        designer.avatar = Some(placeholder_avatar(Some(&designer.name)));
    }

    let products: Vec<ProductWithAuthor> = db::products::by_author(&state.db, id)
        .await?
        .into_iter()
        .map(ProductWithAuthor::with_avatar_fallback)
        .collect();

    Ok(Json(json!({ "designer": designer, "products": products })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateDesignerRequest {
    pub description: Option<String>,
    pub banner: Option<String>,
}

/// Designers edit their own page; admins can edit anyone's.
async fn update_profile(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateDesignerRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if caller.id != id && !caller.role.is_admin() {
        return Err(ApiError::Forbidden("Unauthorized to update this profile"));
    }
    if payload.description.is_none() && payload.banner.is_none() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let designer = db::users::update_designer_profile(
        &state.db,
        id,
        payload.description.as_deref(),
        payload.banner.as_deref(),
    )
    .await?
    .ok_or(ApiError::NotFound("Designer not found"))?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "designer": designer,
    })))
}
