// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gym directory, registration, map and feedback routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::feedback::average_rating;
use crate::models::gym::{filter_gyms, GymFilter};
use crate::models::{Gym, GymFeedback, GymStatus, Role};
use crate::services::wilaya::{NearbyGym, Wilaya};
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_LIMIT: usize = 100;

/// Routes open to anonymous visitors.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/wilayas", get(list_wilayas))
        .route("/api/gyms", get(list_gyms))
        .route("/api/gyms/map", get(gym_map))
        .route("/api/gyms/nearby", get(nearby_gyms))
        .route("/api/gyms/{id}", get(get_gym))
        .route("/api/gyms/{id}/feedback", get(list_feedback))
}

/// Routes requiring a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/gyms", post(register_gym))
        .route("/api/gyms/{id}", put(update_gym))
        .route("/api/gyms/{id}/feedback", post(add_feedback))
        .route("/api/owner/gyms", get(owner_gyms))
}

// ─── Directory ───────────────────────────────────────────────

async fn list_wilayas(State(state): State<Arc<AppState>>) -> Json<Vec<Wilaya>> {
    Json(state.wilayas.wilayas().to_vec())
}

#[derive(Deserialize)]
struct GymListQuery {
    search: Option<String>,
    wilaya: Option<String>,
    featured: Option<bool>,
    limit: Option<usize>,
}

async fn list_gyms(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<GymListQuery>,
) -> Result<Json<Vec<Gym>>> {
    let filter = GymFilter {
        search: params.search,
        wilaya: params.wilaya,
        featured: params.featured,
    };
    let gyms = state.db.list_gyms().await?;
    let mut matched = filter_gyms(&gyms, &filter);
    matched.truncate(params.limit.unwrap_or(MAX_LIMIT).min(MAX_LIMIT));

    tracing::debug!(
        search = ?filter.search,
        wilaya = ?filter.wilaya,
        count = matched.len(),
        "Listing gyms"
    );
    Ok(Json(matched))
}

async fn gym_map(State(state): State<Arc<AppState>>) -> Result<Json<FeatureCollection>> {
    let gyms = state.db.list_gyms().await?;
    Ok(Json(state.wilayas.gym_map(&gyms)))
}

#[derive(Deserialize)]
struct NearbyQuery {
    lat: f64,
    lng: f64,
    limit: Option<usize>,
}

async fn nearby_gyms(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<NearbyQuery>,
) -> Result<Json<Vec<NearbyGym>>> {
    if !(-90.0..=90.0).contains(&params.lat) || !(-180.0..=180.0).contains(&params.lng) {
        return Err(AppError::BadRequest(
            "lat must be within [-90, 90] and lng within [-180, 180]".to_string(),
        ));
    }
    let gyms = state.db.list_gyms().await?;
    let mut nearby = state.wilayas.nearby(&gyms, params.lat, params.lng);
    nearby.truncate(params.limit.unwrap_or(20).min(MAX_LIMIT));
    Ok(Json(nearby))
}

/// A single active gym. Pending and suspended gyms are listed under
/// `/api/owner/gyms` instead.
async fn get_gym(
    State(state): State<Arc<AppState>>,
    Path(gym_id): Path<String>,
) -> Result<Json<Gym>> {
    let gym = state
        .db
        .get_gym(&gym_id)
        .await?
        .filter(Gym::is_active)
        .ok_or_else(|| AppError::NotFound(format!("Gym {} not found", gym_id)))?;
    Ok(Json(gym))
}

#[derive(Deserialize)]
struct OwnerGymsQuery {
    /// Admins may list another owner's gyms
    owner_email: Option<String>,
}

/// Gyms owned by the caller (any status).
async fn owner_gyms(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<OwnerGymsQuery>,
) -> Result<Json<Vec<Gym>>> {
    let owner_email = match params.owner_email {
        Some(email) if email != auth.profile.email => {
            if !auth.is_admin() {
                return Err(AppError::Forbidden(
                    "Only admins may list another owner's gyms".to_string(),
                ));
            }
            email
        }
        _ => auth.profile.email.clone(),
    };
    let mut gyms = state.db.gyms_for_owner(&owner_email).await?;
    gyms.reverse();
    Ok(Json(gyms))
}

// ─── Registration & Updates ──────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct GymRequest {
    #[validate(length(min = 2, max = 120))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[validate(length(min = 1, max = 256))]
    pub address: String,
    #[validate(length(min = 1, max = 64))]
    pub city: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(max = 30))]
    pub amenities: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub hours: String,
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub image_url: String,
    #[validate(range(min = 1, max = 10000))]
    pub capacity: Option<u32>,
}

/// Partial gym update. `status` and `featured` are admin-only.
#[derive(Deserialize, Validate, Default)]
pub struct GymUpdateRequest {
    #[validate(length(min = 2, max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub city: Option<String>,
    pub area: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 30))]
    pub amenities: Option<Vec<String>>,
    #[validate(length(max = 256))]
    pub hours: Option<String>,
    #[validate(length(max = 1024))]
    pub image_url: Option<String>,
    #[validate(range(min = 1, max = 10000))]
    pub capacity: Option<u32>,
    pub status: Option<GymStatus>,
    pub featured: Option<bool>,
}

/// Canonical wilaya name for `area`, or an error for unknown wilayas.
fn resolve_area(state: &AppState, area: &str) -> Result<String> {
    let area = area.trim();
    if area.is_empty() {
        return Ok(String::new());
    }
    state
        .wilayas
        .find(area)
        .map(|w| w.name.clone())
        .ok_or_else(|| AppError::BadRequest(format!("Unknown wilaya: {}", area)))
}

fn clean_amenities(amenities: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = amenities
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    cleaned.sort();
    cleaned.dedup();
    cleaned
}

/// Register a gym. It starts as `pending` until an admin activates it.
async fn register_gym(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(payload): ApiJson<GymRequest>,
) -> Result<(StatusCode, Json<Gym>)> {
    payload.validate()?;
    let area = resolve_area(&state, &payload.area)?;

    let gym = Gym {
        id: Uuid::new_v4().to_string(),
        name: payload.name.trim().to_string(),
        owner_email: auth.profile.email.clone(),
        description: payload.description.trim().to_string(),
        address: payload.address.trim().to_string(),
        city: payload.city.trim().to_string(),
        area,
        phone: payload.phone.trim().to_string(),
        amenities: clean_amenities(payload.amenities),
        hours: payload.hours.trim().to_string(),
        image_url: payload.image_url.trim().to_string(),
        status: GymStatus::Pending,
        capacity: payload.capacity,
        featured: false,
        created_at: Utc::now(),
    };
    state.db.upsert_gym(&gym).await?;

    if auth.role == Role::Member {
        state.db.set_user_role(&auth.user_id, Role::GymOwner).await?;
    }

    tracing::info!(gym_id = %gym.id, owner = %gym.owner_email, "Gym registered (pending)");
    Ok((StatusCode::CREATED, Json(gym)))
}

async fn update_gym(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(gym_id): Path<String>,
    ApiJson(payload): ApiJson<GymUpdateRequest>,
) -> Result<Json<Gym>> {
    payload.validate()?;

    let mut gym = state
        .db
        .get_gym(&gym_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Gym {} not found", gym_id)))?;

    if gym.owner_email != auth.profile.email && !auth.is_admin() {
        return Err(AppError::Forbidden("You do not own this gym".to_string()));
    }
    if (payload.status.is_some() || payload.featured.is_some()) && !auth.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins may change status or featured".to_string(),
        ));
    }

    if let Some(name) = payload.name {
        gym.name = name.trim().to_string();
    }
    if let Some(description) = payload.description {
        gym.description = description.trim().to_string();
    }
    if let Some(address) = payload.address {
        gym.address = address.trim().to_string();
    }
    if let Some(city) = payload.city {
        gym.city = city.trim().to_string();
    }
    if let Some(area) = payload.area {
        gym.area = resolve_area(&state, &area)?;
    }
    if let Some(phone) = payload.phone {
        gym.phone = phone.trim().to_string();
    }
    if let Some(amenities) = payload.amenities {
        gym.amenities = clean_amenities(amenities);
    }
    if let Some(hours) = payload.hours {
        gym.hours = hours.trim().to_string();
    }
    if let Some(image_url) = payload.image_url {
        gym.image_url = image_url.trim().to_string();
    }
    if payload.capacity.is_some() {
        gym.capacity = payload.capacity;
    }
    if let Some(status) = payload.status {
        tracing::info!(gym_id = %gym.id, from = ?gym.status, to = ?status, "Gym status changed");
        gym.status = status;
    }
    if let Some(featured) = payload.featured {
        gym.featured = featured;
    }

    state.db.upsert_gym(&gym).await?;
    Ok(Json(gym))
}

// ─── Feedback ────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FeedbackListResponse {
    pub average_rating: f64,
    pub count: usize,
    pub feedback: Vec<GymFeedback>,
}

async fn list_feedback(
    State(state): State<Arc<AppState>>,
    Path(gym_id): Path<String>,
) -> Result<Json<FeedbackListResponse>> {
    let feedback = state.db.feedback_for_gym(&gym_id).await?;
    Ok(Json(FeedbackListResponse {
        average_rating: average_rating(&feedback),
        count: feedback.len(),
        feedback,
    }))
}

#[derive(Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub comment: String,
}

async fn add_feedback(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(gym_id): Path<String>,
    ApiJson(payload): ApiJson<FeedbackRequest>,
) -> Result<(StatusCode, Json<GymFeedback>)> {
    payload.validate()?;

    let gym = state
        .db
        .get_gym(&gym_id)
        .await?
        .filter(Gym::is_active)
        .ok_or_else(|| AppError::NotFound(format!("Gym {} not found", gym_id)))?;

    let feedback = GymFeedback {
        id: Uuid::new_v4().to_string(),
        gym_id: gym.id,
        user_email: auth.profile.email.clone(),
        user_name: auth.profile.full_name(),
        rating: payload.rating,
        comment: payload.comment.trim().to_string(),
        created_at: Utc::now(),
    };
    state.db.add_feedback(&feedback).await?;

    Ok((StatusCode::CREATED, Json(feedback)))
}
