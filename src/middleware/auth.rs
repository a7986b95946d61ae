// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::error::AppError;
use crate::models::{Role, User};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "trini_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Role at issue time
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user, loaded from the database for each request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
    pub profile: User,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => return Err(AppError::Unauthorized),
        }
    };

    let claims = verify_jwt(&token, &state.config.jwt_signing_key)?;

    // Role comes from the stored profile so demotions apply immediately.
    let profile = state
        .db
        .get_user(&claims.sub)
        .await?
        .ok_or(AppError::InvalidToken)?;

    let auth_user = AuthUser {
        user_id: profile.id.clone(),
        role: profile.role,
        profile,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Verify a session token and return its claims.
pub fn verify_jwt(token: &str, signing_key: &[u8]) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            AppError::InvalidToken
        })
}

/// Create a JWT for a user session.
pub fn create_jwt(
    user_id: &str,
    role: Role,
    signing_key: &[u8],
    ttl_days: i64,
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;
    let ttl_secs = usize::try_from(ttl_days.max(1))? * 24 * 60 * 60;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now,
        exp: now + ttl_secs,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

    #[test]
    fn test_jwt_round_trip_carries_role() {
        let token = create_jwt("u-1", Role::GymOwner, KEY, 30).unwrap();
        let claims = verify_jwt(&token, KEY).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.role, Role::GymOwner);
        assert_eq!(claims.exp - claims.iat, 30 * 24 * 60 * 60);
    }

    #[test]
    fn test_jwt_wrong_key_rejected() {
        let token = create_jwt("u-1", Role::Member, KEY, 30).unwrap();
        assert!(matches!(
            verify_jwt(&token, b"another_key_that_is_long_enough!"),
            Err(AppError::InvalidToken)
        ));
    }
}
