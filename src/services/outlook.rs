// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outlook calendar client (Microsoft identity platform + Microsoft Graph).

use serde::{Deserialize, Serialize};

use super::oauth::{check_response, json_body, post_token_form};
use super::provider::{AuthorizedSession, CalendarProvider, TOKEN_REFRESH_MARGIN_SECS};
use crate::config::OAuthClientConfig;
use crate::error::CalendarError;
use crate::models::{CalendarEvent, CalendarToken, EventPatch, OutlookToken, Provider};
use crate::time_utils::{
    expiry_from_expires_in, format_utc_naive, now_epoch_millis, DEFAULT_TOKEN_LIFETIME_SECS,
};

const MICROSOFT_LOGIN_BASE: &str = "https://login.microsoftonline.com";
const MICROSOFT_GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// `offline_access` is what makes Microsoft issue a refresh token.
pub const OUTLOOK_CALENDAR_SCOPES: &str = "offline_access Calendars.ReadWrite";

/// Microsoft endpoints for one tenant.
#[derive(Debug, Clone)]
pub struct OutlookEndpoints {
    pub authorization_url: String,
    pub token_url: String,
    pub api_base: String,
}

impl OutlookEndpoints {
    pub fn for_tenant(tenant: &str) -> Self {
        Self::with_base(MICROSOFT_LOGIN_BASE, MICROSOFT_GRAPH_API_BASE, tenant)
    }

    pub fn with_base(login_base: &str, api_base: &str, tenant: &str) -> Self {
        let login_base = login_base.trim_end_matches('/');
        Self {
            authorization_url: format!("{}/{}/oauth2/v2.0/authorize", login_base, tenant),
            token_url: format!("{}/{}/oauth2/v2.0/token", login_base, tenant),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for OutlookEndpoints {
    fn default() -> Self {
        Self::for_tenant("common")
    }
}

/// Microsoft Graph calendar client.
#[derive(Clone)]
pub struct OutlookCalendarClient {
    http: reqwest::Client,
    credentials: Option<OAuthClientConfig>,
    endpoints: OutlookEndpoints,
}

impl OutlookCalendarClient {
    pub fn new(http: reqwest::Client, credentials: Option<OAuthClientConfig>) -> Self {
        Self {
            http,
            credentials,
            endpoints: OutlookEndpoints::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: OutlookEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn credentials(&self) -> Result<&OAuthClientConfig, CalendarError> {
        self.credentials
            .as_ref()
            .ok_or(CalendarError::NotConfigured(Provider::Outlook))
    }

    fn event_url(&self, event_id: &str) -> String {
        format!(
            "{}/me/events/{}",
            self.endpoints.api_base,
            urlencoding::encode(event_id)
        )
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// A rejected refresh (revoked consent, expired refresh token) means the
    /// staff member has to reconnect.
    async fn refresh_token(&self, token: &OutlookToken) -> Result<OutlookToken, CalendarError> {
        let credentials = self.credentials()?;

        let response = post_token_form(
            &self.http,
            Provider::Outlook,
            &self.endpoints.token_url,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", token.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
                ("scope", OUTLOOK_CALENDAR_SCOPES),
            ],
        )
        .await
        .map_err(|e| match e {
            CalendarError::Api {
                status: Some(400 | 401),
                ..
            } => {
                tracing::warn!(error = %e, "Outlook refresh token rejected");
                CalendarError::ReconnectRequired(Provider::Outlook)
            }
            other => other,
        })?;

        Ok(OutlookToken {
            refresh_token: response
                .refresh_token()
                .unwrap_or(&token.refresh_token)
                .to_string(),
            expiry_epoch_millis: expiry_from_expires_in(response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)),
            scope: response.scope.unwrap_or_else(|| token.scope.clone()),
            access_token: response.access_token,
        })
    }
}

impl CalendarProvider for OutlookCalendarClient {
    type Token = OutlookToken;

    fn provider(&self) -> Provider {
        Provider::Outlook
    }

    fn authorization_url(&self, state: &str) -> Result<String, CalendarError> {
        let credentials = self.credentials()?;

        let url = reqwest::Url::parse_with_params(
            &self.endpoints.authorization_url,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("response_mode", "query"),
                ("scope", OUTLOOK_CALENDAR_SCOPES),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| {
            CalendarError::api(
                Provider::Outlook,
                None,
                format!("Invalid authorization endpoint: {}", e),
            )
        })?;

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<OutlookToken, CalendarError> {
        let credentials = self.credentials()?;

        let response = post_token_form(
            &self.http,
            Provider::Outlook,
            &self.endpoints.token_url,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
                ("scope", OUTLOOK_CALENDAR_SCOPES),
            ],
        )
        .await?;

        let refresh_token = response
            .refresh_token()
            .ok_or(CalendarError::MissingRefreshToken(Provider::Outlook))?
            .to_string();

        tracing::info!("Outlook authorization code exchanged");

        Ok(OutlookToken {
            expiry_epoch_millis: expiry_from_expires_in(response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)),
            scope: response
                .scope
                .unwrap_or_else(|| OUTLOOK_CALENDAR_SCOPES.to_string()),
            access_token: response.access_token,
            refresh_token,
        })
    }

    async fn authorize(
        &self,
        token: &OutlookToken,
    ) -> Result<AuthorizedSession<OutlookToken>, CalendarError> {
        let expired = CalendarToken::from(token.clone())
            .is_expired(now_epoch_millis(), TOKEN_REFRESH_MARGIN_SECS * 1000);
        if !expired {
            return Ok(AuthorizedSession::unchanged(&token.access_token));
        }

        if token.refresh_token.trim().is_empty() {
            tracing::warn!("Outlook access token expired and no refresh token stored");
            return Err(CalendarError::ReconnectRequired(Provider::Outlook));
        }

        tracing::info!("Outlook access token expired, refreshing");
        let refreshed = self.refresh_token(token).await?;

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
        let mut body = OutlookEventPayload::from(event);
        // Graph deduplicates creates that carry the same transactionId.
        body.transaction_id = idempotency_key.map(str::to_string);

        let response = self
            .http
            .post(format!("{}/me/events", self.endpoints.api_base))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::api(Provider::Outlook, None, e.to_string()))?;

        let created: CreatedEvent = json_body(Provider::Outlook, response).await?;
        if created.id.is_empty() {
            return Err(CalendarError::api(
                Provider::Outlook,
                None,
                "Created event has no id",
            ));
        }
        Ok(created.id)
    }

    async fn update_event(
        &self,
        access_token: &str,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<String, CalendarError> {
        let body = OutlookEventPayload::from(patch);

        let response = self
            .http
            .patch(self.event_url(event_id))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::api(Provider::Outlook, None, e.to_string()))?;

        let updated: CreatedEvent = json_body(Provider::Outlook, response).await?;
        if updated.id.is_empty() {
            return Ok(event_id.to_string());
        }
        Ok(updated.id)
    }

    async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), CalendarError> {
        let response = self
            .http
            .delete(self.event_url(event_id))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| CalendarError::api(Provider::Outlook, None, e.to_string()))?;

        check_response(Provider::Outlook, response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    #[serde(default)]
    id: String,
}

/// Graph event body; absent fields are left untouched by PATCH.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutlookEventPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<ItemBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<DateTimeTimeZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<DateTimeTimeZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<Attendee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody {
    content_type: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DateTimeTimeZone {
    date_time: String,
    time_zone: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    display_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Attendee {
    email_address: EmailAddress,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct EmailAddress {
    address: String,
}

fn item_body(content: &str) -> ItemBody {
    ItemBody {
        content_type: "text",
        content: content.to_string(),
    }
}

fn utc_time(at: chrono::DateTime<chrono::Utc>) -> DateTimeTimeZone {
    DateTimeTimeZone {
        date_time: format_utc_naive(at),
        time_zone: "UTC",
    }
}

fn location(name: &str) -> Location {
    Location {
        display_name: name.to_string(),
    }
}

fn attendees(emails: Vec<String>) -> Vec<Attendee> {
    emails
        .into_iter()
        .map(|address| Attendee {
            email_address: EmailAddress { address },
            kind: "required",
        })
        .collect()
}

impl From<&CalendarEvent> for OutlookEventPayload {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            subject: Some(event.title.clone()),
            body: event.description.as_deref().map(item_body),
            start: Some(utc_time(event.start_time)),
            end: Some(utc_time(event.end_time)),
            location: event.location.as_deref().map(location),
            attendees: Some(attendees(event.attendee_emails())),
            transaction_id: None,
        }
    }
}

impl From<&EventPatch> for OutlookEventPayload {
    fn from(patch: &EventPatch) -> Self {
        Self {
            subject: patch.title.clone(),
            body: patch.description.as_deref().map(item_body),
            start: patch.start_time.map(utc_time),
            end: patch.end_time.map(utc_time),
            location: patch.location.as_deref().map(location),
            attendees: patch.attendee_emails().map(attendees),
            transaction_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn tenant_endpoints() {
        let endpoints = OutlookEndpoints::for_tenant("contoso.onmicrosoft.com");
        assert_eq!(
            endpoints.token_url,
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
        assert_eq!(endpoints.api_base, "https://graph.microsoft.com/v1.0");
    }

    #[test]
    fn patch_only_includes_provided_fields() {
        let patch = EventPatch {
            location: Some("Board room".to_string()),
            end_time: Some(Utc.with_ymd_and_hms(2026, 6, 2, 11, 30, 0).unwrap()),
            ..Default::default()
        };

        let body = serde_json::to_value(OutlookEventPayload::from(&patch)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "end": {"dateTime": "2026-06-02T11:30:00", "timeZone": "UTC"},
                "location": {"displayName": "Board room"}
            })
        );
    }

    #[test]
    fn create_body_maps_attendees() {
        let event = CalendarEvent {
            title: "Interview".to_string(),
            description: Some("Bring ID".to_string()),
            start_time: Utc.with_ymd_and_hms(2026, 6, 2, 9, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 6, 2, 10, 0, 0).unwrap(),
            location: None,
            attendees: vec!["candidate@example.com".to_string(), "front desk".to_string()],
        };

        let body = serde_json::to_value(OutlookEventPayload::from(&event)).unwrap();
        assert_eq!(body["subject"], "Interview");
        assert_eq!(body["body"]["contentType"], "text");
        assert_eq!(body["start"]["dateTime"], "2026-06-02T09:00:00");
        assert_eq!(
            body["attendees"],
            serde_json::json!([
                {"emailAddress": {"address": "candidate@example.com"}, "type": "required"}
            ])
        );
        assert!(body.get("transactionId").is_none());
    }
}
