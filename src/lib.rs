// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! TRini213: gym memberships across Algeria
//!
//! This crate provides the backend API for members buying visit plans,
//! gym owners scanning member QR codes at the front desk, and the
//! entitlement decision that says whether a visit is covered by a plan or
//! must be paid as a single visit.

pub mod config;
pub mod db;
pub mod error;
pub mod i18n;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Db;
use error::AppError;
use services::{ChatService, EntitlementService, MembershipService, SupportAssistant, WilayaService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub entitlement: EntitlementService,
    pub memberships: MembershipService,
    pub chat: ChatService,
    pub wilayas: WilayaService,
}

impl AppState {
    /// Wire up services over `db`.
    ///
    /// The wilaya gazetteer is read from `config.wilaya_data_path`; the
    /// bundled copy is used when that file cannot be loaded.
    pub fn new(config: Config, db: Db) -> Result<Self, AppError> {
        let wilayas = match WilayaService::load_from_file(&config.wilaya_data_path) {
            Ok(wilayas) => wilayas,
            Err(e) => {
                tracing::warn!(
                    path = %config.wilaya_data_path,
                    error = %e,
                    "Falling back to bundled wilaya data"
                );
                WilayaService::builtin()
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Wilaya data: {}", e)))?
            }
        };

        let assistant = SupportAssistant::new(
            config.assistant_url.clone(),
            config.assistant_timeout_secs,
            config.membership_validity_days,
        )?;

        Ok(Self {
            entitlement: EntitlementService::new(db.clone()),
            memberships: MembershipService::new(db.clone(), config.membership_validity_days),
            chat: ChatService::new(db.clone(), assistant),
            wilayas,
            db,
            config,
        })
    }
}
