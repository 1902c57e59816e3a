// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - calendar adapters, sync facade and token persistence.

pub mod calendar;
pub mod google;
pub mod host;
pub mod oauth;
pub mod oauth_state;
pub mod outlook;
pub mod provider;
pub mod token_store;

pub use calendar::CalendarSyncService;
pub use google::{GoogleCalendarClient, GoogleEndpoints};
pub use host::HostCalendarService;
pub use oauth_state::OAuthStateCodec;
pub use outlook::{OutlookCalendarClient, OutlookEndpoints};
pub use provider::{AuthorizedSession, CalendarProvider, TOKEN_REFRESH_MARGIN_SECS};
pub use token_store::{InMemoryTokenStore, TokenStore};
