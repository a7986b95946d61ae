// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TRini213 API Server
//!
//! Serves gym discovery, membership purchases and front-desk check-ins.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trini213::{config::Config, db::Db, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting TRini213 API");

    let db = match &config.gcp_project_id {
        Some(project_id) => Db::firestore(project_id).await?,
        None => {
            tracing::warn!("GCP_PROJECT_ID not set; using in-memory storage (data is not persisted)");
            Db::in_memory()
        }
    };
    tracing::info!(backend = db.backend_name(), "Storage initialized");

    let state = AppState::new(config.clone(), db)?;
    tracing::info!(
        wilayas = state.wilayas.wilayas().len(),
        admins = config.admin_emails.len(),
        "Services initialized"
    );

    // Build router
    let app = trini213::routes::create_router(Arc::new(state));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trini213=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
