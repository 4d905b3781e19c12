//! Bearer-token authentication and role gating.
//!
//! Tokens are HS256 JWTs carrying the user id, valid for seven days. Every
//! authenticated request re-validates the user against the database; there is
//! no session cache or revocation list. Role checks live in the typed
//! extractors below so handlers state their requirement in the signature.

use anyhow::anyhow;
use axum::{async_trait, extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::ApiError;
use crate::models::{Role, User};
use crate::AppState;

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

pub fn issue_token(user_id: i64, secret: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        exp: (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| ApiError::Internal(anyhow!("failed to sign token: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<i64, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims.sub)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::Unauthorized("Token expired"),
        _ => ApiError::Unauthorized("Invalid token"),
    })
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(anyhow!("failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    bcrypt::verify(password, hash)
        .map_err(|e| ApiError::Internal(anyhow!("failed to verify password: {e}")))
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized("Access token required"))
}

async fn user_from_parts(parts: &Parts, state: &AppState) -> Result<User, ApiError> {
    let token = bearer_token(parts)?;
    let user_id = verify_token(token, &state.config.jwt_secret)?;
    db::users::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::Unauthorized("Invalid token"))
}

/// Any authenticated user.
pub struct AuthUser(pub User);

/// Authenticated user with role `customer`.
pub struct Customer(pub User);

/// Authenticated merchant or admin.
pub struct Staff(pub User);

/// Authenticated admin.
pub struct AdminUser(pub User);

/// Authenticated user when a valid token is present, `None` otherwise.
/// Used by guest-capable endpoints; an invalid token degrades to anonymous
/// instead of rejecting the request.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        user_from_parts(parts, state).await.map(Self)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Customer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = user_from_parts(parts, state).await?;
        if user.role != Role::Customer {
            return Err(ApiError::Forbidden("Customer access required"));
        }
        Ok(Self(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Staff {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = user_from_parts(parts, state).await?;
        if !user.role.is_staff() {
            return Err(ApiError::Forbidden("Admin or Merchant access required"));
        }
        Ok(Self(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = user_from_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(ApiError::Forbidden("Admin access required"));
        }
        Ok(Self(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(user_from_parts(parts, state).await.ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trip() {
        let token = issue_token(42, SECRET).unwrap();
        assert_eq!(verify_token(&token, SECRET).unwrap(), 42);
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let token = issue_token(42, SECRET).unwrap();
        let err = verify_token(&token, "other-secret").unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized("Invalid token")));
    }

    #[test]
    fn token_rejects_garbage() {
        let err = verify_token("not-a-jwt", SECRET).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized("Invalid token")));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let claims = Claims {
            sub: 7,
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let err = verify_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized("Token expired")));
    }

    #[test]
    fn password_hash_round_trip() {
        // Low cost keeps the test fast; production uses DEFAULT_COST.
        let hash = bcrypt::hash("hunter22", 4).unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }
}
