// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Token payload. `sub` carries the user id as a string.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    pub sub: String,
    /// `user` or `admin`.
    pub role: String,
    /// Unix timestamp.
    pub exp: usize,
}

impl Claims {
    /// Parses the subject back into a user id.
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Signs an HS256 token valid for `ttl_secs` seconds.
pub fn sign_jwt(id: i64, role: &str, secret: &str, ttl_secs: u64) -> Result<String, AppError> {
    let expires_at = Utc::now() + Duration::seconds(ttl_secs as i64);

    let claims = Claims {
        sub: id.to_string(),
        role: role.to_owned(),
        exp: expires_at.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Decodes a token, checking signature and expiry. Any failure is an `AuthError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Token from an `Authorization: Bearer <token>` header, if present.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Claims for public routes that show more to a signed-in caller.
/// A missing or invalid token reads as anonymous.
pub fn optional_claims(headers: &HeaderMap, secret: &str) -> Option<Claims> {
    bearer_token(headers).and_then(|token| verify_jwt(token, secret).ok())
}

/// Rejects requests without a valid bearer token (401) and stores the
/// decoded `Claims` in the request extensions for handlers.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims =
        optional_claims(req.headers(), &config.jwt_secret).ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Admin gate; layer it inside `auth_middleware`. Non-admins get 403.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    match req.extensions().get::<Claims>() {
        None => Err(StatusCode::UNAUTHORIZED),
        Some(claims) if !claims.is_admin() => {
            tracing::warn!(user = %claims.sub, "non-admin hit an admin route");
            Err(StatusCode::FORBIDDEN)
        }
        Some(_) => Ok(next.run(req).await),
    }
}
