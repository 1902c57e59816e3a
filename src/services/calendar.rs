// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider-agnostic calendar sync facade.
//!
//! Routes each request to the matching adapter and converts every outcome
//! into a `SyncResult`. Sync, update and delete never return an error; the
//! OAuth helpers (auth URL, code exchange) do, since the caller has nothing
//! to persist on failure.

use crate::config::Config;
use crate::error::CalendarError;
use crate::models::{CalendarEvent, CalendarToken, EventPatch, Provider, SyncResult};

use super::google::GoogleCalendarClient;
use super::oauth_state::OAuthStateCodec;
use super::outlook::{OutlookCalendarClient, OutlookEndpoints};
use super::provider::CalendarProvider;

/// Result of one adapter call: the event id (if any) and refreshed credentials.
struct Attempt {
    result: Result<Option<String>, CalendarError>,
    updated_token: Option<CalendarToken>,
}

impl Attempt {
    fn failed(error: CalendarError) -> Self {
        Self {
            result: Err(error),
            updated_token: None,
        }
    }
}

/// Single entry point for calendar sync across providers.
#[derive(Clone)]
pub struct CalendarSyncService {
    google: GoogleCalendarClient,
    outlook: OutlookCalendarClient,
    state_codec: OAuthStateCodec,
}

impl CalendarSyncService {
    /// Build adapters from configuration, sharing one HTTP client.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::new();
        let google = GoogleCalendarClient::new(http.clone(), config.google.clone());
        let outlook = OutlookCalendarClient::new(http, config.outlook.clone())
            .with_endpoints(OutlookEndpoints::for_tenant(&config.outlook_tenant));

        Ok(Self::from_parts(
            google,
            outlook,
            OAuthStateCodec::new(&config.oauth_state_key)?,
        ))
    }

    pub fn from_parts(
        google: GoogleCalendarClient,
        outlook: OutlookCalendarClient,
        state_codec: OAuthStateCodec,
    ) -> Self {
        Self {
            google,
            outlook,
            state_codec,
        }
    }

    /// Parse a provider tag, rejecting unknown and reserved providers.
    pub fn resolve_provider(tag: &str) -> Result<Provider, CalendarError> {
        match tag.parse::<Provider>()? {
            Provider::Custom => Err(CalendarError::NotImplemented(
                Provider::Custom.to_string(),
            )),
            provider => Ok(provider),
        }
    }

    /// Resolve the provider and check the token belongs to it.
    fn resolve_with_token(tag: &str, token: &CalendarToken) -> Result<Provider, CalendarError> {
        let provider = Self::resolve_provider(tag)?;
        token.validate_for(provider)?;
        Ok(provider)
    }

    // ─── OAuth ───────────────────────────────────────────────────────────────

    /// Vendor consent URL for `staff_id`, who is recovered from `state` on callback.
    pub fn get_calendar_auth_url(
        &self,
        provider: &str,
        staff_id: &str,
    ) -> Result<String, CalendarError> {
        let provider = Self::resolve_provider(provider)?;
        let state = self.state_codec.encode(staff_id);

        match provider {
            Provider::Google => self.google.authorization_url(&state),
            Provider::Outlook => self.outlook.authorization_url(&state),
            Provider::Custom => Err(CalendarError::NotImplemented(provider.to_string())),
        }
    }

    /// Recover the staff id from a callback `state`, if it is authentic and fresh.
    pub fn decode_state(&self, state: &str) -> Option<String> {
        self.state_codec.decode(state)
    }

    /// Exchange an OAuth callback code for a provider token.
    pub async fn exchange_calendar_code_for_tokens(
        &self,
        provider: &str,
        code: &str,
    ) -> Result<CalendarToken, CalendarError> {
        let provider = Self::resolve_provider(provider)?;
        if code.trim().is_empty() {
            return Err(CalendarError::InvalidCredentials(
                "authorization code is empty".to_string(),
            ));
        }

        match provider {
            Provider::Google => self.google.exchange_code(code).await.map(Into::into),
            Provider::Outlook => self.outlook.exchange_code(code).await.map(Into::into),
            Provider::Custom => Err(CalendarError::NotImplemented(provider.to_string())),
        }
    }

    // ─── Event sync ──────────────────────────────────────────────────────────

    /// Create the remote event for a meeting.
    ///
    /// `idempotency_key` (typically the meeting id) lets a retried create be
    /// recognized instead of producing a duplicate event.
    pub async fn sync_meeting_to_calendar(
        &self,
        provider: &str,
        token: &CalendarToken,
        event: &CalendarEvent,
        idempotency_key: Option<&str>,
    ) -> SyncResult {
        let checked = Self::resolve_with_token(provider, token).and_then(|_| event.check());
        let attempt = match (checked, token) {
            (Err(e), _) => Attempt::failed(e),
            (Ok(()), CalendarToken::Google(t)) => {
                create_with(&self.google, t, event, idempotency_key).await
            }
            (Ok(()), CalendarToken::Outlook(t)) => {
                create_with(&self.outlook, t, event, idempotency_key).await
            }
        };
        envelope(provider, "sync", attempt)
    }

    /// Apply `patch` to the remote event `event_id`.
    pub async fn update_meeting_in_calendar(
        &self,
        provider: &str,
        token: &CalendarToken,
        event_id: &str,
        patch: &EventPatch,
    ) -> SyncResult {
        let checked =
            Self::resolve_with_token(provider, token).and_then(|_| check_event_id(event_id));
        let attempt = match (checked, token) {
            (Err(e), _) => Attempt::failed(e),
            (Ok(()), CalendarToken::Google(t)) => {
                update_with(&self.google, t, event_id, patch).await
            }
            (Ok(()), CalendarToken::Outlook(t)) => {
                update_with(&self.outlook, t, event_id, patch).await
            }
        };
        envelope(provider, "update", attempt)
    }

    /// Remove the remote event `event_id`.
    pub async fn delete_meeting_from_calendar(
        &self,
        provider: &str,
        token: &CalendarToken,
        event_id: &str,
    ) -> SyncResult {
        let checked =
            Self::resolve_with_token(provider, token).and_then(|_| check_event_id(event_id));
        let attempt = match (checked, token) {
            (Err(e), _) => Attempt::failed(e),
            (Ok(()), CalendarToken::Google(t)) => delete_with(&self.google, t, event_id).await,
            (Ok(()), CalendarToken::Outlook(t)) => delete_with(&self.outlook, t, event_id).await,
        };
        envelope(provider, "delete", attempt)
    }
}

fn check_event_id(event_id: &str) -> Result<(), CalendarError> {
    if event_id.trim().is_empty() {
        return Err(CalendarError::InvalidEvent(
            "remote event id is empty".to_string(),
        ));
    }
    Ok(())
}

async fn create_with<P: CalendarProvider>(
    adapter: &P,
    token: &P::Token,
    event: &CalendarEvent,
    idempotency_key: Option<&str>,
) -> Attempt {
    let session = match adapter.authorize(token).await {
        Ok(session) => session,
        Err(e) => return Attempt::failed(e),
    };

    Attempt {
        result: adapter
            .create_event(&session.access_token, event, idempotency_key)
            .await
            .map(Some),
        updated_token: session.refreshed.map(Into::into),
    }
}

async fn update_with<P: CalendarProvider>(
    adapter: &P,
    token: &P::Token,
    event_id: &str,
    patch: &EventPatch,
) -> Attempt {
    let session = match adapter.authorize(token).await {
        Ok(session) => session,
        Err(e) => return Attempt::failed(e),
    };

    Attempt {
        result: adapter
            .update_event(&session.access_token, event_id, patch)
            .await
            .map(Some),
        updated_token: session.refreshed.map(Into::into),
    }
}

async fn delete_with<P: CalendarProvider>(
    adapter: &P,
    token: &P::Token,
    event_id: &str,
) -> Attempt {
    let session = match adapter.authorize(token).await {
        Ok(session) => session,
        Err(e) => return Attempt::failed(e),
    };

    Attempt {
        result: adapter
            .delete_event(&session.access_token, event_id)
            .await
            .map(|()| Some(event_id.to_string())),
        updated_token: session.refreshed.map(Into::into),
    }
}

/// Convert an attempt into the uniform envelope, logging the outcome.
///
/// Refreshed credentials are returned even when the event call failed, so
/// the caller never loses a token the vendor has already rotated.
fn envelope(provider: &str, operation: &'static str, attempt: Attempt) -> SyncResult {
    let tag = provider.trim().to_ascii_lowercase();
    let refreshed = attempt.updated_token.is_some();

    let mut result = match attempt.result {
        Ok(event_id) => {
            tracing::info!(
                provider = %tag,
                operation,
                event_id = event_id.as_deref().unwrap_or(""),
                refreshed,
                "Calendar sync succeeded"
            );
            SyncResult::ok(tag, event_id, None)
        }
        Err(e) => {
            tracing::warn!(
                provider = %tag,
                operation,
                kind = e.kind(),
                error = %e,
                refreshed,
                "Calendar sync failed"
            );
            SyncResult::failed(tag, e)
        }
    };
    result.updated_token = attempt.updated_token;
    result
}
