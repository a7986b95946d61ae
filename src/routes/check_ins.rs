// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Front-desk scanning, check-ins and the owner dashboard.

use crate::error::{AppError, Result};
use crate::i18n::{translate, Locale, Message};
use crate::middleware::auth::AuthUser;
use crate::models::{
    CheckIn, Eligibility, GymStats, Membership, SingleVisitFee, SingleVisitPayment, User,
    VisitPaymentMethod,
};
use crate::services::entitlement::ScanOutcome;
use crate::time_utils::{business_offset, start_of_day};
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 100;
const DASHBOARD_RECENT: usize = 100;

/// Header carrying the idempotency key of a paid confirmation.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/scan", post(scan))
        .route("/api/check-ins", get(my_check_ins).post(plan_check_in))
        .route("/api/check-ins/paid", post(paid_check_in))
        .route("/api/gyms/{id}/check-ins", get(gym_check_ins))
        .route("/api/owner/dashboard", get(dashboard))
}

#[derive(Deserialize, Default)]
struct LangQuery {
    lang: Option<String>,
}

// ─── Responses ───────────────────────────────────────────────

/// Member details shown to staff.
#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MemberSummary {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub profile_image: String,
}

impl From<&User> for MemberSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.full_name(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            profile_image: user.profile_image.clone(),
        }
    }
}

/// Localized message for the operator.
#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DisplayMessage {
    pub locale: Locale,
    pub rtl: bool,
    pub text: String,
}

impl DisplayMessage {
    fn new(message: Message, locale: Locale) -> Self {
        Self {
            locale,
            rtl: locale.is_rtl(),
            text: translate(message, locale).to_string(),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ScanResponse {
    pub gym_id: String,
    pub gym_name: String,
    pub member: MemberSummary,
    pub membership: Option<Membership>,
    pub decision: Eligibility,
    pub eligible: bool,
    pub reason: Option<crate::models::DenialReason>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub days_left: i64,
    pub remaining_visits: u32,
    /// Present when the visit must be paid
    pub single_visit_fee: Option<SingleVisitFee>,
    pub message: DisplayMessage,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlanCheckInResponse {
    pub check_in: CheckIn,
    pub member: MemberSummary,
    pub membership: Membership,
    pub remaining_visits: u32,
    pub message: DisplayMessage,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PaidCheckInResponse {
    pub check_in: CheckIn,
    pub payment: SingleVisitPayment,
    pub fee: SingleVisitFee,
    /// True when an earlier confirmation with the same key was returned
    pub replayed: bool,
    pub message: DisplayMessage,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckInListResponse {
    pub check_ins: Vec<CheckIn>,
    pub next_cursor: Option<String>,
}

// ─── Scanning & Check-ins ────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct ScanRequest {
    /// Raw QR payload (`TRINI213:<user id>:<email>`) or a bare user ID
    #[validate(length(min = 1, max = 512))]
    pub qr_code: String,
    /// Gym being operated; defaults to the caller's first gym
    #[serde(default)]
    pub gym_id: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct PaidCheckInRequest {
    #[validate(length(min = 1, max = 512))]
    pub qr_code: String,
    #[serde(default)]
    pub gym_id: Option<String>,
    #[serde(default)]
    pub payment_method: VisitPaymentMethod,
    /// Also accepted as the `Idempotency-Key` header
    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: Option<String>,
}

/// Evaluate a scanned member without recording anything.
async fn scan(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(lang): ApiQuery<LangQuery>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ScanRequest>,
) -> Result<Json<ScanResponse>> {
    payload.validate()?;
    let locale = Locale::negotiate(lang.lang.as_deref(), &headers);

    let gym = state
        .entitlement
        .operating_gym(&auth.profile, payload.gym_id.as_deref())
        .await?;
    let ScanOutcome {
        member,
        membership,
        eligibility,
    } = state.entitlement.scan(&payload.qr_code, Utc::now()).await?;

    let (message, fee) = match eligibility.reason() {
        None => (Message::MembershipValid, None),
        Some(reason) => (Message::from(reason), Some(SingleVisitFee::standard())),
    };
    let remaining_visits = membership.as_ref().map_or(0, |m| m.remaining_visits);

    tracing::info!(
        gym_id = %gym.id,
        operator = %auth.user_id,
        member_id = %member.id,
        eligible = eligibility.is_eligible(),
        "Scan evaluated"
    );

    Ok(Json(ScanResponse {
        gym_id: gym.id,
        gym_name: gym.name,
        member: MemberSummary::from(&member),
        membership,
        eligible: eligibility.is_eligible(),
        reason: eligibility.reason(),
        days_left: eligibility.days_left(),
        remaining_visits,
        decision: eligibility,
        single_visit_fee: fee,
        message: DisplayMessage::new(message, locale),
    }))
}

/// Record a plan visit.
async fn plan_check_in(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(lang): ApiQuery<LangQuery>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ScanRequest>,
) -> Result<(StatusCode, Json<PlanCheckInResponse>)> {
    payload.validate()?;
    let locale = Locale::negotiate(lang.lang.as_deref(), &headers);

    let gym = state
        .entitlement
        .operating_gym(&auth.profile, payload.gym_id.as_deref())
        .await?;
    let visit = state
        .entitlement
        .check_in_with_plan(&gym, &payload.qr_code, Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PlanCheckInResponse {
            remaining_visits: visit.membership.remaining_visits,
            member: MemberSummary::from(&visit.member),
            check_in: visit.check_in,
            membership: visit.membership,
            message: DisplayMessage::new(Message::CheckInSuccess, locale),
        }),
    ))
}

/// Record a paid single visit.
async fn paid_check_in(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(lang): ApiQuery<LangQuery>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<PaidCheckInRequest>,
) -> Result<(StatusCode, Json<PaidCheckInResponse>)> {
    payload.validate()?;
    let locale = Locale::negotiate(lang.lang.as_deref(), &headers);

    let header_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let idempotency_key = payload.idempotency_key.or(header_key);

    let gym = state
        .entitlement
        .operating_gym(&auth.profile, payload.gym_id.as_deref())
        .await?;
    let paid = state
        .entitlement
        .check_in_with_payment(
            &gym,
            &payload.qr_code,
            payload.payment_method,
            idempotency_key.as_deref(),
            Utc::now(),
        )
        .await?;

    let status = if paid.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(PaidCheckInResponse {
            fee: paid.payment.fee(),
            check_in: paid.check_in,
            payment: paid.payment,
            replayed: paid.replayed,
            message: DisplayMessage::new(Message::CheckInSuccess, locale),
        }),
    ))
}

// ─── Listings ────────────────────────────────────────────────

/// Position after the last check-in of a page (newest-first order).
#[derive(Debug, Clone, PartialEq)]
struct CheckInCursor {
    check_in_time: DateTime<Utc>,
    id: String,
}

const CURSOR_PARTS: usize = 3;

fn parse_cursor(cursor: Option<&str>) -> Result<Option<CheckInCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor = || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;

            let parts: Vec<&str> = decoded_str.splitn(CURSOR_PARTS, ':').collect();
            if parts.len() != CURSOR_PARTS || parts[2].is_empty() {
                return Err(invalid_cursor());
            }

            let seconds = parts[0].parse::<i64>().map_err(|_| invalid_cursor())?;
            let nanos = parts[1].parse::<u32>().map_err(|_| invalid_cursor())?;
            let check_in_time =
                DateTime::from_timestamp(seconds, nanos).ok_or_else(invalid_cursor)?;

            Ok(CheckInCursor {
                check_in_time,
                id: parts[2].to_string(),
            })
        })
        .transpose()
}

fn encode_cursor(check_in: &CheckIn) -> String {
    let payload = format!(
        "{}:{}:{}",
        check_in.check_in_time.timestamp(),
        check_in.check_in_time.timestamp_subsec_nanos(),
        check_in.id
    );
    URL_SAFE_NO_PAD.encode(payload)
}

/// One page of `check_ins` (already sorted newest first).
fn paginate(
    check_ins: Vec<CheckIn>,
    cursor: Option<&CheckInCursor>,
    limit: usize,
) -> CheckInListResponse {
    let mut page: Vec<CheckIn> = check_ins
        .into_iter()
        .filter(|c| match cursor {
            Some(cursor) => {
                (c.check_in_time, c.id.as_str()) < (cursor.check_in_time, cursor.id.as_str())
            }
            None => true,
        })
        .take(limit + 1)
        .collect();

    let next_cursor = if page.len() > limit {
        page.truncate(limit);
        page.last().map(encode_cursor)
    } else {
        None
    };

    CheckInListResponse {
        check_ins: page,
        next_cursor,
    }
}

#[derive(Deserialize)]
struct CheckInListQuery {
    limit: Option<usize>,
    cursor: Option<String>,
    /// Only check-ins since local midnight
    #[serde(default)]
    today: bool,
}

impl CheckInListQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// The caller's own visits.
async fn my_check_ins(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<CheckInListQuery>,
) -> Result<Json<CheckInListResponse>> {
    let cursor = parse_cursor(params.cursor.as_deref())?;
    let check_ins = state.db.check_ins_for_user(&auth.profile.email).await?;
    Ok(Json(paginate(check_ins, cursor.as_ref(), params.limit())))
}

/// Visits at one gym (its owner or an admin).
async fn gym_check_ins(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(gym_id): Path<String>,
    ApiQuery(params): ApiQuery<CheckInListQuery>,
) -> Result<Json<CheckInListResponse>> {
    let cursor = parse_cursor(params.cursor.as_deref())?;
    let gym = state
        .db
        .get_gym(&gym_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Gym {} not found", gym_id)))?;
    if gym.owner_email != auth.profile.email && !auth.is_admin() {
        return Err(AppError::Forbidden("You do not operate this gym".to_string()));
    }

    let mut check_ins = state.db.check_ins_for_gym(&gym.id).await?;
    if params.today {
        let now = Utc::now();
        let offset = business_offset(state.config.business_utc_offset_hours);
        let since = start_of_day(now, offset);
        check_ins.retain(|c| c.check_in_time >= since);
    }
    Ok(Json(paginate(check_ins, cursor.as_ref(), params.limit())))
}

// ─── Dashboard ───────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardResponse {
    pub gym_id: String,
    pub gym_name: String,
    pub stats: GymStats,
    pub recent_check_ins: Vec<CheckIn>,
}

#[derive(Deserialize)]
struct DashboardQuery {
    gym_id: Option<String>,
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<DashboardQuery>,
) -> Result<Json<DashboardResponse>> {
    let gym = state
        .entitlement
        .operating_gym(&auth.profile, params.gym_id.as_deref())
        .await?;

    let (mut check_ins, payments) = futures_util::try_join!(
        state.db.check_ins_for_gym(&gym.id),
        state.db.single_visit_payments_for_gym(&gym.id),
    )?;

    let offset = business_offset(state.config.business_utc_offset_hours);
    let stats = GymStats::compute(&check_ins, &payments, Utc::now(), offset);
    check_ins.truncate(DASHBOARD_RECENT);

    Ok(Json(DashboardResponse {
        gym_id: gym.id,
        gym_name: gym.name,
        stats,
        recent_check_ins: check_ins,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckInStatus;
    use chrono::{Duration, TimeZone};

    fn check_in(id: &str, at: DateTime<Utc>) -> CheckIn {
        CheckIn {
            id: id.to_string(),
            user_email: "amine@example.dz".to_string(),
            user_name: "Amine".to_string(),
            gym_id: "g1".to_string(),
            gym_name: "Atlas Fit".to_string(),
            check_in_time: at,
            membership_status: CheckInStatus::Active,
            membership_id: None,
            idempotency_key: None,
        }
    }

    #[test]
    fn test_cursor_round_trip() {
        let c = check_in(
            "6f1c",
            Utc.with_ymd_and_hms(2026, 4, 2, 8, 30, 0).unwrap() + Duration::nanoseconds(5),
        );
        let cursor = parse_cursor(Some(&encode_cursor(&c))).unwrap().unwrap();
        assert_eq!(cursor.check_in_time, c.check_in_time);
        assert_eq!(cursor.id, "6f1c");
    }

    #[test]
    fn test_invalid_cursor_rejected() {
        assert!(matches!(
            parse_cursor(Some("not base64!")),
            Err(AppError::BadRequest(_))
        ));
        let no_id = URL_SAFE_NO_PAD.encode("1:0:");
        assert!(parse_cursor(Some(&no_id)).is_err());
    }

    #[test]
    fn test_paginate_walks_all_pages() {
        let base = Utc.with_ymd_and_hms(2026, 4, 2, 8, 0, 0).unwrap();
        // Newest first, two sharing a timestamp.
        let all = vec![
            check_in("e", base + Duration::minutes(4)),
            check_in("d", base + Duration::minutes(3)),
            check_in("c", base + Duration::minutes(3)),
            check_in("b", base + Duration::minutes(1)),
            check_in("a", base),
        ];

        let first = paginate(all.clone(), None, 2);
        assert_eq!(ids(&first.check_ins), vec!["e", "d"]);
        let cursor = parse_cursor(first.next_cursor.as_deref()).unwrap();

        let second = paginate(all.clone(), cursor.as_ref(), 2);
        assert_eq!(ids(&second.check_ins), vec!["c", "b"]);
        let cursor = parse_cursor(second.next_cursor.as_deref()).unwrap();

        let third = paginate(all, cursor.as_ref(), 2);
        assert_eq!(ids(&third.check_ins), vec!["a"]);
        assert!(third.next_cursor.is_none());
    }

    fn ids(check_ins: &[CheckIn]) -> Vec<&str> {
        check_ins.iter().map(|c| c.id.as_str()).collect()
    }
}
