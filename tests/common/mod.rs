// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use visitdesk_calendar::config::Config;
use visitdesk_calendar::middleware::auth::Claims;
use visitdesk_calendar::models::{CalendarEvent, CalendarToken, GoogleToken, OutlookToken};
use visitdesk_calendar::routes::create_router;
use visitdesk_calendar::services::{
    CalendarSyncService, GoogleCalendarClient, GoogleEndpoints, HostCalendarService,
    InMemoryTokenStore, OAuthStateCodec, OutlookCalendarClient, OutlookEndpoints,
};
use visitdesk_calendar::time_utils::now_epoch_millis;
use visitdesk_calendar::AppState;
use wiremock::MockServer;

/// Everything a test needs, with every vendor endpoint on one mock server.
#[allow(dead_code)]
pub struct TestContext {
    pub server: MockServer,
    pub config: Config,
    pub calendar: Arc<CalendarSyncService>,
    pub store: InMemoryTokenStore,
    pub hosts: HostCalendarService,
}

#[allow(dead_code)]
impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(Config::test_default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let server = MockServer::start().await;
        let calendar = Arc::new(test_calendar_service(&server, &config));
        let store = InMemoryTokenStore::new();
        let hosts = HostCalendarService::new(calendar.clone(), Arc::new(store.clone()));

        Self {
            server,
            config,
            calendar,
            store,
            hosts,
        }
    }

    /// A session JWT for `staff_id`, as the main app would issue it.
    pub fn session_token(&self, staff_id: &str) -> String {
        session_token(staff_id, &self.config.session_jwt_key)
    }

    pub fn router(&self) -> axum::Router {
        let state = Arc::new(AppState {
            config: self.config.clone(),
            calendar: self.calendar.clone(),
            hosts: self.hosts.clone(),
        });
        create_router(state)
    }
}

/// Facade whose adapters talk to `server` instead of Google and Microsoft.
///
/// Google paths: `/token`, `/calendar/v3/...`. Microsoft paths:
/// `/common/oauth2/v2.0/token`, `/graph/me/events...`.
#[allow(dead_code)]
pub fn test_calendar_service(server: &MockServer, config: &Config) -> CalendarSyncService {
    let http = reqwest::Client::new();
    let uri = server.uri();

    let google = GoogleCalendarClient::new(http.clone(), config.google.clone())
        .with_endpoints(GoogleEndpoints::with_base(&uri));
    let outlook = OutlookCalendarClient::new(http, config.outlook.clone())
        .with_endpoints(OutlookEndpoints::with_base(
            &uri,
            &format!("{}/graph", uri),
            "common",
        ));

    CalendarSyncService::from_parts(
        google,
        outlook,
        OAuthStateCodec::new(&config.oauth_state_key).unwrap(),
    )
}

#[allow(dead_code)]
pub fn session_token(staff_id: &str, signing_key: &[u8]) -> String {
    let now = (now_epoch_millis() / 1000) as usize;
    let claims = Claims {
        sub: staff_id.to_string(),
        iat: now,
        exp: now + 3600,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .expect("Failed to create JWT")
}

#[allow(dead_code)]
pub fn fresh_expiry() -> i64 {
    now_epoch_millis() + 3_600_000
}

#[allow(dead_code)]
pub fn past_expiry() -> i64 {
    now_epoch_millis() - 60_000
}

#[allow(dead_code)]
pub fn google_token(access: &str, expiry_epoch_millis: i64) -> CalendarToken {
    CalendarToken::Google(GoogleToken {
        access_token: access.to_string(),
        refresh_token: "1//google-refresh".to_string(),
        expiry_epoch_millis,
        scope: "https://www.googleapis.com/auth/calendar".to_string(),
        token_type: "Bearer".to_string(),
    })
}

#[allow(dead_code)]
pub fn outlook_token(access: &str, refresh: &str, expiry_epoch_millis: i64) -> CalendarToken {
    CalendarToken::Outlook(OutlookToken {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expiry_epoch_millis,
        scope: "offline_access Calendars.ReadWrite".to_string(),
    })
}

#[allow(dead_code)]
pub fn sample_event() -> CalendarEvent {
    let start = Utc.with_ymd_and_hms(2026, 11, 3, 14, 0, 0).unwrap();
    CalendarEvent {
        title: "Visitor: Dana Okafor".to_string(),
        description: Some("Facilities walkthrough".to_string()),
        start_time: start,
        end_time: start + Duration::minutes(45),
        location: Some("Reception, Building 2".to_string()),
        attendees: vec!["dana@example.com".to_string()],
    }
}
