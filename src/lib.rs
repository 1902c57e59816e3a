// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! VisitDesk calendar sync: keep hosts' Google and Outlook calendars in
//! step with scheduled visitor meetings.
//!
//! This crate provides the provider adapters, the sync facade the meeting
//! layer calls, and the OAuth connect routes.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{CalendarSyncService, HostCalendarService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub calendar: Arc<CalendarSyncService>,
    pub hosts: HostCalendarService,
}
