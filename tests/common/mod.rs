// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use trini213::config::Config;
use trini213::db::Db;
use trini213::middleware::auth::create_jwt;
use trini213::models::{Gym, GymStatus, Membership, MembershipStatus, PlanType, Role, User};
use trini213::routes::create_router;
use trini213::services::entitlement::member_qr_payload;
use trini213::time_utils::format_date;
use trini213::AppState;
use uuid::Uuid;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection against the emulator.
#[allow(dead_code)]
pub async fn test_db() -> Db {
    Db::firestore("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app over the in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(
        AppState::new(Config::test_default(), Db::in_memory()).expect("Failed to build state"),
    );
    (create_router(state.clone()), state)
}

/// Store a user with the given role. The password hash is not usable.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, username: &str, role: Role) -> User {
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        email: format!("{}@example.dz", username),
        first_name: username.to_string(),
        last_name: "Test".to_string(),
        phone: String::new(),
        address: String::new(),
        city: "Alger".to_string(),
        birth_date: None,
        emergency_contact: String::new(),
        emergency_phone: String::new(),
        fitness_goals: String::new(),
        profile_image: String::new(),
        role,
        password_hash: String::new(),
        created_at: Utc::now(),
    };
    state.db.upsert_user(&user).await.expect("seed user");
    user
}

/// Store a gym owned by `owner`.
#[allow(dead_code)]
pub async fn seed_gym(state: &AppState, owner: &User, name: &str, status: GymStatus) -> Gym {
    let gym = Gym {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        owner_email: owner.email.clone(),
        description: "Musculation et cardio".to_string(),
        address: "12 Rue Didouche Mourad".to_string(),
        city: "Alger".to_string(),
        area: "Alger".to_string(),
        phone: String::new(),
        amenities: vec!["Sauna".to_string()],
        hours: "08:00-22:00".to_string(),
        image_url: String::new(),
        status,
        capacity: Some(80),
        featured: false,
        created_at: Utc::now(),
    };
    state.db.upsert_gym(&gym).await.expect("seed gym");
    gym
}

/// Store an active professional membership expiring `expires_in_days` from today.
#[allow(dead_code)]
pub async fn seed_membership(
    state: &AppState,
    member: &User,
    remaining_visits: u32,
    expires_in_days: i64,
) -> Membership {
    let today = Utc::now().date_naive();
    seed_membership_with_expiry(
        state,
        member,
        remaining_visits,
        format_date(today + Duration::days(expires_in_days)),
    )
    .await
}

/// Store an active membership with a raw expiry date string.
#[allow(dead_code)]
pub async fn seed_membership_with_expiry(
    state: &AppState,
    member: &User,
    remaining_visits: u32,
    expiry_date: String,
) -> Membership {
    let membership = Membership {
        id: Uuid::new_v4().to_string(),
        user_email: member.email.clone(),
        plan_type: PlanType::Professional,
        status: MembershipStatus::Active,
        total_visits: 15,
        remaining_visits,
        price: 4900,
        purchase_date: format_date(Utc::now().date_naive()),
        expiry_date,
        created_at: Utc::now(),
    };
    state
        .db
        .upsert_membership(&membership)
        .await
        .expect("seed membership");
    membership
}

/// Session token for `user`.
#[allow(dead_code)]
pub fn token_for(state: &AppState, user: &User) -> String {
    create_jwt(
        &user.id,
        user.role,
        &state.config.jwt_signing_key,
        state.config.jwt_ttl_days,
    )
    .expect("create token")
}

/// QR payload shown by `user`'s app.
#[allow(dead_code)]
pub fn qr_for(user: &User) -> String {
    member_qr_payload(user)
}

/// Send a request and decode the JSON body (Null when empty).
#[allow(dead_code)]
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
