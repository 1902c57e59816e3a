// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Capability shared by every calendar provider adapter.

use crate::error::CalendarError;
use crate::models::{CalendarEvent, CalendarToken, EventPatch, Provider};

/// Margin before token expiration when we proactively refresh (5 minutes).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// A ready-to-use access token, plus the refreshed credentials if a refresh happened.
#[derive(Debug, Clone)]
pub struct AuthorizedSession<T> {
    pub access_token: String,
    /// Set when the stored token was refreshed; the caller must persist it.
    pub refreshed: Option<T>,
}

impl<T> AuthorizedSession<T> {
    pub fn unchanged(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refreshed: None,
        }
    }
}

/// OAuth and single-event operations against one external calendar.
///
/// Callers always go through `authorize` before an event operation; each
/// adapter decides whether the stored token can be used as-is.
#[allow(async_fn_in_trait)]
pub trait CalendarProvider {
    type Token: Clone + Into<CalendarToken>;

    fn provider(&self) -> Provider;

    /// Vendor consent URL carrying `state` back to our callback.
    fn authorization_url(&self, state: &str) -> Result<String, CalendarError>;

    /// Exchange an authorization code for a token pair.
    async fn exchange_code(&self, code: &str) -> Result<Self::Token, CalendarError>;

    /// Produce a valid access token, refreshing if the provider supports it.
    async fn authorize(
        &self,
        token: &Self::Token,
    ) -> Result<AuthorizedSession<Self::Token>, CalendarError>;

    /// Create one remote event and return its id.
    ///
    /// With an idempotency key, retrying the same create does not produce a
    /// second remote event.
    async fn create_event(
        &self,
        access_token: &str,
        event: &CalendarEvent,
        idempotency_key: Option<&str>,
    ) -> Result<String, CalendarError>;

    /// Apply the provided fields of `patch` to an existing event.
    async fn update_event(
        &self,
        access_token: &str,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<String, CalendarError>;

    async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), CalendarError>;
}
