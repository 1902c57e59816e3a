// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar client.
//!
//! Handles:
//! - Authorization URL construction (offline access, forced consent)
//! - Code exchange and lazy token refresh
//! - Create/update/delete of one event on the staff member's primary calendar

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::oauth::{check_response, json_body, post_token_form, vendor_error, OAuthTokenResponse};
use super::provider::{AuthorizedSession, CalendarProvider, TOKEN_REFRESH_MARGIN_SECS};
use crate::config::OAuthClientConfig;
use crate::error::CalendarError;
use crate::models::{CalendarEvent, CalendarToken, EventPatch, GoogleToken, Provider};
use crate::time_utils::{
    expiry_from_expires_in, format_utc_rfc3339, now_epoch_millis, DEFAULT_TOKEN_LIFETIME_SECS,
};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

const EVENT_STATUS_CANCELLED: &str = "cancelled";
const EVENT_STATUS_CONFIRMED: &str = "confirmed";

/// Read/write access to calendars and events.
pub const GOOGLE_CALENDAR_SCOPES: &str =
    "https://www.googleapis.com/auth/calendar https://www.googleapis.com/auth/calendar.events";

/// Google endpoints; overridable so tests can point at a mock server.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub authorization_url: String,
    pub token_url: String,
    pub api_base: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            authorization_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            api_base: GOOGLE_CALENDAR_API_BASE.to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// All endpoints under one base URL, mirroring Google's paths.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorization_url: format!("{}/o/oauth2/v2/auth", base),
            token_url: format!("{}/token", base),
            api_base: format!("{}/calendar/v3", base),
        }
    }
}

/// Google Calendar API client.
#[derive(Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    credentials: Option<OAuthClientConfig>,
    endpoints: GoogleEndpoints,
    calendar_id: String,
}

impl GoogleCalendarClient {
    /// Create a client; `credentials` is `None` when Google is not configured.
    pub fn new(http: reqwest::Client, credentials: Option<OAuthClientConfig>) -> Self {
        Self {
            http,
            credentials,
            endpoints: GoogleEndpoints::default(),
            calendar_id: "primary".to_string(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn credentials(&self) -> Result<&OAuthClientConfig, CalendarError> {
        self.credentials
            .as_ref()
            .ok_or(CalendarError::NotConfigured(Provider::Google))
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.endpoints.api_base,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    /// Refresh an expired access token.
    async fn refresh_token(&self, token: &GoogleToken) -> Result<GoogleToken, CalendarError> {
        let credentials = self.credentials()?;

        if token.refresh_token.trim().is_empty() {
            return Err(CalendarError::ReconnectRequired(Provider::Google));
        }

        let response = post_token_form(
            &self.http,
            Provider::Google,
            &self.endpoints.token_url,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", token.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ],
        )
        .await
        .map_err(|e| match e {
            // Revoked or expired refresh token: only a new consent helps.
            CalendarError::Api {
                status: Some(400 | 401),
                ..
            } => {
                tracing::warn!(error = %e, "Google refresh token rejected");
                CalendarError::ReconnectRequired(Provider::Google)
            }
            other => other,
        })?;

        Ok(refreshed_token(token, response))
    }

    /// Adopt the event already stored under `body.id`.
    ///
    /// Google keeps ids of deleted events around as cancelled events, so a
    /// cancelled one is restored with the new contents.
    async fn reuse_existing_event(
        &self,
        access_token: &str,
        mut body: GoogleEvent,
    ) -> Result<String, CalendarError> {
        let id = body.id.clone().unwrap_or_default();
        let url = self.event_url(&id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| CalendarError::api(Provider::Google, None, e.to_string()))?;
        let existing: GoogleEvent = json_body(Provider::Google, response).await?;

        if existing.status.as_deref() != Some(EVENT_STATUS_CANCELLED) {
            tracing::info!(event_id = %id, "Google event already exists, reusing");
            return Ok(id);
        }

        tracing::info!(event_id = %id, "Restoring cancelled Google event");
        body.status = Some(EVENT_STATUS_CONFIRMED.to_string());

        let response = self
            .http
            .put(&url)
            .bearer_auth(access_token)
            .query(&[("sendUpdates", "all")])
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::api(Provider::Google, None, e.to_string()))?;
        let restored: GoogleEvent = json_body(Provider::Google, response).await?;

        if restored.status.as_deref() == Some(EVENT_STATUS_CANCELLED) {
            return Err(CalendarError::api(
                Provider::Google,
                None,
                "Cancelled event could not be restored",
            ));
        }
        Ok(id)
    }
}

impl CalendarProvider for GoogleCalendarClient {
    type Token = GoogleToken;

    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn authorization_url(&self, state: &str) -> Result<String, CalendarError> {
        let credentials = self.credentials()?;

        let url = reqwest::Url::parse_with_params(
            &self.endpoints.authorization_url,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", GOOGLE_CALENDAR_SCOPES),
                // Offline access plus forced consent guarantees a refresh token.
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("include_granted_scopes", "true"),
                ("state", state),
            ],
        )
        .map_err(|e| {
            CalendarError::api(
                Provider::Google,
                None,
                format!("Invalid authorization endpoint: {}", e),
            )
        })?;

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<GoogleToken, CalendarError> {
        let credentials = self.credentials()?;

        let response = post_token_form(
            &self.http,
            Provider::Google,
            &self.endpoints.token_url,
            &[
                ("code", code),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ],
        )
        .await?;

        // Google omits the refresh token when the user granted consent before.
        let refresh_token = response
            .refresh_token()
            .ok_or(CalendarError::MissingRefreshToken(Provider::Google))?
            .to_string();

        tracing::info!("Google Calendar authorization code exchanged");

        Ok(GoogleToken {
            expiry_epoch_millis: expiry_from_expires_in(response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)),
            scope: response
                .scope
                .unwrap_or_else(|| GOOGLE_CALENDAR_SCOPES.to_string()),
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            access_token: response.access_token,
            refresh_token,
        })
    }

    async fn authorize(
        &self,
        token: &GoogleToken,
    ) -> Result<AuthorizedSession<GoogleToken>, CalendarError> {
        let expired = CalendarToken::from(token.clone())
            .is_expired(now_epoch_millis(), TOKEN_REFRESH_MARGIN_SECS * 1000);
        if !expired {
            return Ok(AuthorizedSession::unchanged(&token.access_token));
        }

        tracing::info!("Google access token expired, refreshing");
        let refreshed = self.refresh_token(token).await?;
        tracing::info!(
            expiry_epoch_millis = refreshed.expiry_epoch_millis,
            "Google access token refreshed"
        );

        Ok(AuthorizedSession {
            access_token: refreshed.access_token.clone(),
            refreshed: Some(refreshed),
        })
    }

    async fn create_event(
        &self,
        access_token: &str,
        event: &CalendarEvent,
        idempotency_key: Option<&str>,
    ) -> Result<String, CalendarError> {
        let mut body = GoogleEvent::from(event);
        body.id = idempotency_key.map(google_event_id);

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(access_token)
            .query(&[("sendUpdates", "all")])
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::api(Provider::Google, None, e.to_string()))?;

        // A client-supplied id that already exists means an earlier attempt
        // got as far as creating the event.
        if response.status() == reqwest::StatusCode::CONFLICT {
            if body.id.is_none() {
                return Err(vendor_error(Provider::Google, response).await);
            }
            return self.reuse_existing_event(access_token, body).await;
        }

        let created: GoogleEvent = json_body(Provider::Google, response).await?;
        created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                CalendarError::api(Provider::Google, None, "Created event has no id")
            })
    }

    async fn update_event(
        &self,
        access_token: &str,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<String, CalendarError> {
        let url = self.event_url(event_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| CalendarError::api(Provider::Google, None, e.to_string()))?;
        let mut remote: GoogleEvent = json_body(Provider::Google, response).await?;

        remote.apply(patch);

        let response = self
            .http
            .put(&url)
            .bearer_auth(access_token)
            .query(&[("sendUpdates", "all")])
            .json(&remote)
            .send()
            .await
            .map_err(|e| CalendarError::api(Provider::Google, None, e.to_string()))?;
        let updated: GoogleEvent = json_body(Provider::Google, response).await?;

        Ok(updated.id.unwrap_or_else(|| event_id.to_string()))
    }

    async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), CalendarError> {
        let response = self
            .http
            .delete(self.event_url(event_id))
            .bearer_auth(access_token)
            .query(&[("sendUpdates", "all")])
            .send()
            .await
            .map_err(|e| CalendarError::api(Provider::Google, None, e.to_string()))?;

        check_response(Provider::Google, response).await?;
        Ok(())
    }
}

/// Deterministic Google event id for an idempotency key.
///
/// Google accepts client ids made of base32hex characters (`0-9a-v`), 5 to
/// 1024 long; a lowercase hex digest satisfies that.
pub fn google_event_id(idempotency_key: &str) -> String {
    let digest = Sha256::digest(format!("visitdesk:{}", idempotency_key).as_bytes());
    hex::encode(digest)
}

fn refreshed_token(previous: &GoogleToken, response: OAuthTokenResponse) -> GoogleToken {
    GoogleToken {
        refresh_token: response
            .refresh_token()
            .unwrap_or(&previous.refresh_token)
            .to_string(),
        expiry_epoch_millis: expiry_from_expires_in(response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)),
        scope: response.scope.unwrap_or_else(|| previous.scope.clone()),
        token_type: response
            .token_type
            .unwrap_or_else(|| previous.token_type.clone()),
        access_token: response.access_token,
    }
}

/// Google Calendar event resource.
///
/// Fields we do not manage are kept in `extra` so a read-modify-write update
/// sends them back untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<GoogleEventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<GoogleEventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<GoogleAttendee>>,
    /// `confirmed`, `tentative` or `cancelled`
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

impl GoogleEventTime {
    fn utc(at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            date_time: Some(format_utc_rfc3339(at)),
            date: None,
            time_zone: Some("UTC".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GoogleAttendee {
    email: String,
    /// responseStatus, displayName, ... as returned by Google
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl GoogleAttendee {
    fn new(email: String) -> Self {
        Self {
            email,
            extra: Map::new(),
        }
    }
}

impl From<&CalendarEvent> for GoogleEvent {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            id: None,
            summary: Some(event.title.clone()),
            description: event.description.clone(),
            location: event.location.clone(),
            start: Some(GoogleEventTime::utc(event.start_time)),
            end: Some(GoogleEventTime::utc(event.end_time)),
            attendees: Some(
                event
                    .attendee_emails()
                    .into_iter()
                    .map(GoogleAttendee::new)
                    .collect(),
            ),
            status: None,
            extra: Map::new(),
        }
    }
}

impl GoogleEvent {
    /// Overwrite only the fields present in `patch`.
    fn apply(&mut self, patch: &EventPatch) {
        if let Some(title) = &patch.title {
            self.summary = Some(title.clone());
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(location) = &patch.location {
            self.location = Some(location.clone());
        }
        if let Some(start) = patch.start_time {
            self.start = Some(GoogleEventTime::utc(start));
        }
        if let Some(end) = patch.end_time {
            self.end = Some(GoogleEventTime::utc(end));
        }
        if let Some(emails) = patch.attendee_emails() {
            // Keep RSVP state for attendees that stay on the invite.
            let existing = self.attendees.take().unwrap_or_default();
            let attendees = emails
                .into_iter()
                .map(|email| {
                    existing
                        .iter()
                        .find(|a| a.email.eq_ignore_ascii_case(&email))
                        .cloned()
                        .unwrap_or_else(|| GoogleAttendee::new(email))
                })
                .collect();
            self.attendees = Some(attendees);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn event_id_is_valid_base32hex() {
        let id = google_event_id("meeting-42");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_digit() || ('a'..='v').contains(&c)));
        assert_eq!(id, google_event_id("meeting-42"));
        assert_ne!(id, google_event_id("meeting-43"));
    }

    #[test]
    fn event_body_uses_utc_times_and_filters_attendees() {
        let event = CalendarEvent {
            title: "Site visit".to_string(),
            description: Some("Badge at front desk".to_string()),
            start_time: Utc.with_ymd_and_hms(2026, 6, 2, 9, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 6, 2, 10, 0, 0).unwrap(),
            location: None,
            attendees: vec!["visitor@example.com".to_string(), "Bob".to_string()],
        };

        let body = serde_json::to_value(GoogleEvent::from(&event)).unwrap();
        assert_eq!(body["summary"], "Site visit");
        assert_eq!(body["start"]["dateTime"], "2026-06-02T09:00:00Z");
        assert_eq!(body["end"]["timeZone"], "UTC");
        assert_eq!(body["attendees"], serde_json::json!([{"email": "visitor@example.com"}]));
        assert!(body.get("location").is_none());
        assert!(body.get("id").is_none());
    }

    #[test]
    fn apply_preserves_unpatched_and_unknown_fields() {
        let mut remote: GoogleEvent = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "summary": "Old title",
            "description": "Keep me",
            "location": "Lobby",
            "colorId": "5",
            "attendees": [{"email": "a@example.com", "responseStatus": "accepted"}]
        }))
        .unwrap();

        remote.apply(&EventPatch {
            title: Some("New title".to_string()),
            attendees: Some(vec!["A@example.com".to_string(), "b@example.com".to_string()]),
            ..Default::default()
        });

        let json = serde_json::to_value(&remote).unwrap();
        assert_eq!(json["summary"], "New title");
        assert_eq!(json["description"], "Keep me");
        assert_eq!(json["location"], "Lobby");
        assert_eq!(json["colorId"], "5");
        assert_eq!(json["attendees"][0]["responseStatus"], "accepted");
        assert_eq!(json["attendees"][1]["email"], "b@example.com");
    }

    #[test]
    fn refresh_keeps_previous_refresh_token() {
        let previous = GoogleToken {
            access_token: "old".to_string(),
            refresh_token: "1//keep".to_string(),
            expiry_epoch_millis: 0,
            scope: "s".to_string(),
            token_type: "Bearer".to_string(),
        };
        let response: OAuthTokenResponse =
            serde_json::from_str(r#"{"access_token":"new","expires_in":3599}"#).unwrap();

        let refreshed = refreshed_token(&previous, response);
        assert_eq!(refreshed.access_token, "new");
        assert_eq!(refreshed.refresh_token, "1//keep");
        assert!(refreshed.expiry_epoch_millis > now_epoch_millis());
    }
}
