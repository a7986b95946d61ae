// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plan catalogue, membership purchases and payment history.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::membership::{Plan, PLANS};
use crate::models::{
    Eligibility, Membership, Payment, PaymentMethod, PlanType, SingleVisitFee,
    SingleVisitPayment,
};
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_LIMIT: usize = 100;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/plans", get(list_plans))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/memberships",
            get(list_memberships).post(purchase_membership),
        )
        .route("/api/memberships/current", get(current_membership))
        .route("/api/payments", get(list_payments))
        .route("/api/single-visit-payments", get(list_single_visit_payments))
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

impl LimitQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(MAX_LIMIT).min(MAX_LIMIT)
    }
}

// ─── Catalogue ───────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlansResponse {
    pub plans: Vec<Plan>,
    /// How long a purchased plan stays valid
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub validity_days: i64,
    /// Price of a visit not covered by a plan
    pub single_visit_fee: SingleVisitFee,
}

async fn list_plans(State(state): State<Arc<AppState>>) -> Json<PlansResponse> {
    Json(PlansResponse {
        plans: PLANS.to_vec(),
        validity_days: state.memberships.validity_days(),
        single_visit_fee: SingleVisitFee::standard(),
    })
}

// ─── Memberships ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PurchaseRequest {
    pub plan_type: PlanType,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PurchaseResponse {
    pub membership: Membership,
    pub payment: Payment,
}

async fn purchase_membership(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(payload): ApiJson<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>)> {
    let (membership, payment) = state
        .memberships
        .purchase(
            &auth.profile,
            payload.plan_type,
            payload.payment_method,
            Utc::now(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            membership,
            payment,
        }),
    ))
}

async fn list_memberships(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<LimitQuery>,
) -> Result<Json<Vec<Membership>>> {
    let mut memberships = state
        .db
        .memberships_for_user(&auth.profile.email)
        .await?;
    memberships.truncate(params.limit());
    Ok(Json(memberships))
}

/// The membership a scan would use, evaluated now.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CurrentMembershipResponse {
    pub membership: Option<Membership>,
    /// True when the next visit is covered by the plan
    pub usable: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub days_left: i64,
    pub eligibility: Eligibility,
}

async fn current_membership(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<CurrentMembershipResponse>> {
    let (membership, eligibility) = state
        .memberships
        .current(&auth.profile, Utc::now())
        .await?;
    Ok(Json(CurrentMembershipResponse {
        membership,
        usable: eligibility.is_eligible(),
        days_left: eligibility.days_left(),
        eligibility,
    }))
}

// ─── Payments ────────────────────────────────────────────────

async fn list_payments(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<LimitQuery>,
) -> Result<Json<Vec<Payment>>> {
    let mut payments = state.db.payments_for_user(&auth.profile.email).await?;
    payments.truncate(params.limit());
    Ok(Json(payments))
}

async fn list_single_visit_payments(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<LimitQuery>,
) -> Result<Json<Vec<SingleVisitPayment>>> {
    let mut payments = state
        .db
        .single_visit_payments_for_user(&auth.profile.email)
        .await?;
    payments.truncate(params.limit());
    Ok(Json(payments))
}
