// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! VisitDesk calendar API server
//!
//! Serves the calendar OAuth connect flow and hosts the sync facade used to
//! mirror visitor meetings into staff calendars.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visitdesk_calendar::{
    config::Config,
    services::{CalendarSyncService, HostCalendarService, InMemoryTokenStore},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        google = config.google.is_some(),
        outlook = config.outlook.is_some(),
        "Starting VisitDesk calendar API"
    );

    let calendar = Arc::new(CalendarSyncService::new(&config)?);

    // Tokens live in process memory; the meeting layer's database is the
    // durable store in production deployments.
    let store = Arc::new(InMemoryTokenStore::new());
    let hosts = HostCalendarService::new(calendar.clone(), store);

    let state = Arc::new(AppState {
        config: config.clone(),
        calendar,
        hosts,
    });

    // Build router
    let app = visitdesk_calendar::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("visitdesk_calendar=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
