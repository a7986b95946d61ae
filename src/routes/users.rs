// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Current-user profile routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Role, User};
use crate::services::entitlement::member_qr_payload;
use crate::time_utils::{format_utc_rfc3339, parse_date};
use crate::routes::extract::ApiJson;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/me", get(get_me).put(update_me))
        .route("/api/users/me/qr", get(get_qr))
}

/// Public view of a user (no password hash).
#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub birth_date: Option<String>,
    pub emergency_contact: String,
    pub emergency_phone: String,
    pub fitness_goals: String,
    pub profile_image: String,
    pub role: Role,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            city: user.city.clone(),
            birth_date: user.birth_date.clone(),
            emergency_contact: user.emergency_contact.clone(),
            emergency_phone: user.emergency_phone.clone(),
            fitness_goals: user.fitness_goals.clone(),
            profile_image: user.profile_image.clone(),
            role: user.role,
            created_at: format_utc_rfc3339(user.created_at),
        }
    }
}

async fn get_me(Extension(auth): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&auth.profile))
}

/// Profile fields a user may change. Absent fields are left as they are.
#[derive(Deserialize, Validate, Default)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 64))]
    pub first_name: Option<String>,
    #[validate(length(max = 64))]
    pub last_name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 256))]
    pub address: Option<String>,
    #[validate(length(max = 64))]
    pub city: Option<String>,
    /// YYYY-MM-DD; empty clears it
    pub birth_date: Option<String>,
    #[validate(length(max = 128))]
    pub emergency_contact: Option<String>,
    #[validate(length(max = 32))]
    pub emergency_phone: Option<String>,
    #[validate(length(max = 1000))]
    pub fitness_goals: Option<String>,
    #[validate(url)]
    pub profile_image: Option<String>,
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    payload.validate()?;

    let mut user = auth.profile;
    let set = |field: &mut String, value: Option<String>| {
        if let Some(value) = value {
            *field = value.trim().to_string();
        }
    };
    set(&mut user.first_name, payload.first_name);
    set(&mut user.last_name, payload.last_name);
    set(&mut user.phone, payload.phone);
    set(&mut user.address, payload.address);
    set(&mut user.city, payload.city);
    set(&mut user.emergency_contact, payload.emergency_contact);
    set(&mut user.emergency_phone, payload.emergency_phone);
    set(&mut user.fitness_goals, payload.fitness_goals);
    set(&mut user.profile_image, payload.profile_image);

    if let Some(birth_date) = payload.birth_date {
        let birth_date = birth_date.trim();
        user.birth_date = if birth_date.is_empty() {
            None
        } else {
            let date = parse_date(birth_date).ok_or_else(|| {
                AppError::BadRequest("birth_date must be YYYY-MM-DD".to_string())
            })?;
            Some(crate::time_utils::format_date(date))
        };
    }

    state.db.upsert_user(&user).await?;
    tracing::debug!(user_id = %user.id, "Profile updated");

    Ok(Json(UserResponse::from(&user)))
}

/// Payload for the member's check-in QR code.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct QrResponse {
    pub payload: String,
}

async fn get_qr(Extension(auth): Extension<AuthUser>) -> Json<QrResponse> {
    Json(QrResponse {
        payload: member_qr_payload(&auth.profile),
    })
}
