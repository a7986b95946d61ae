// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password login, registration and logout.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::{Role, User};
use crate::routes::users::UserResponse;
use crate::routes::extract::ApiJson;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/token", post(login))
        .route("/api/users", post(register))
        .route("/api/logout", post(logout))
}

/// Login with username (or email) and password.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Self-service registration.
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 64))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 64))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(max = 64))]
    pub city: String,
    /// `member` (default) or `gym_owner`
    #[serde(default)]
    pub role: Option<Role>,
}

/// Issued session token.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub expires_in: i64,
    pub user: UserResponse,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>)> {
    payload.validate()?;

    let login = payload.username.trim();
    let user = match state.db.find_user_by_username(login).await? {
        Some(user) => Some(user),
        None if login.contains('@') => state.db.find_user_by_email(&login.to_lowercase()).await?,
        None => None,
    };

    // Same error for unknown user and wrong password.
    let user = user
        .filter(|u| verify_password(&payload.password, &u.password_hash))
        .ok_or_else(|| {
            tracing::info!(login = %login, "Failed login attempt");
            AppError::Unauthorized
        })?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User logged in");
    issue_session(&state, jar, user)
}

async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<TokenResponse>)> {
    payload.validate()?;

    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    let role = match payload.role.unwrap_or_default() {
        Role::Admin => {
            return Err(AppError::Forbidden(
                "The admin role cannot be self-assigned".to_string(),
            ))
        }
        _ if state.config.is_admin_email(&email) => Role::Admin,
        role => role,
    };

    if state.db.find_user_by_username(&username).await?.is_some() {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }
    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        username,
        email,
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        phone: payload.phone.trim().to_string(),
        address: String::new(),
        city: payload.city.trim().to_string(),
        birth_date: None,
        emergency_contact: String::new(),
        emergency_phone: String::new(),
        fitness_goals: String::new(),
        profile_image: String::new(),
        role,
        password_hash,
        created_at: Utc::now(),
    };
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %user.id, role = role.as_str(), "User registered");

    let (jar, body) = issue_session(&state, jar, user)?;
    Ok((StatusCode::CREATED, jar, body))
}

async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}

fn issue_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> Result<(CookieJar, Json<TokenResponse>)> {
    let ttl_days = state.config.jwt_ttl_days;
    let token = create_jwt(&user.id, user.role, &state.config.jwt_signing_key, ttl_days)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(!state.config.frontend_url.starts_with("http://"))
        .same_site(SameSite::Lax);

    Ok((
        jar.add(cookie),
        Json(TokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: ttl_days * 24 * 60 * 60,
            user: UserResponse::from(&user),
        }),
    ))
}

fn hash_password(password: &str) -> std::result::Result<String, argon2::password_hash::Error> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
