// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token persistence around meeting sync.

use serde_json::json;
use visitdesk_calendar::models::{EventPatch, Provider};
use visitdesk_calendar::services::TokenStore;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

mod common;

use common::{fresh_expiry, google_token, outlook_token, past_expiry, sample_event, TestContext};

#[tokio::test]
async fn test_sync_without_connection_reports_not_connected() {
    let ctx = TestContext::new().await;

    let result = ctx
        .hosts
        .sync_meeting("staff-1", "google", "meeting-1", &sample_event())
        .await;

    assert!(!result.success);
    assert_eq!(result.provider, "google");
    assert!(result.error.unwrap().contains("not connected"));
}

#[tokio::test]
async fn test_refreshed_token_is_persisted() {
    let ctx = TestContext::new().await;
    ctx.store
        .put("staff-1", &google_token("access-1", past_expiry()))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/calendar/v3/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "evt-1"})))
        .mount(&ctx.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/calendar/v3/calendars/primary/events/evt-1"))
        .and(header("Authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let created = ctx
        .hosts
        .sync_meeting("staff-1", "google", "meeting-1", &sample_event())
        .await;
    assert!(created.success, "{:?}", created.error);

    let stored = ctx.store.get("staff-1", Provider::Google).await.unwrap().unwrap();
    assert_eq!(stored.access_token(), "access-2");

    // The stored token is now fresh: no second refresh.
    let deleted = ctx.hosts.delete_meeting("staff-1", "google", "evt-1").await;
    assert!(deleted.success, "{:?}", deleted.error);
    assert!(deleted.updated_token.is_none());
}

#[tokio::test]
async fn test_delete_failure_does_not_touch_stored_token() {
    let ctx = TestContext::new().await;
    let token = outlook_token("graph-access", "graph-refresh", fresh_expiry());
    ctx.store.put("staff-2", &token).await.unwrap();

    Mock::given(method("DELETE"))
        .and(path("/graph/me/events/AAMkAD-1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let result = ctx.hosts.delete_meeting("staff-2", "outlook", "AAMkAD-1").await;

    assert!(!result.success);
    assert_eq!(
        ctx.store.get("staff-2", Provider::Outlook).await.unwrap(),
        Some(token)
    );
}

#[tokio::test]
async fn test_update_uses_stored_token() {
    let ctx = TestContext::new().await;
    ctx.store
        .put("staff-3", &outlook_token("graph-access", "graph-refresh", fresh_expiry()))
        .await
        .unwrap();

    Mock::given(method("PATCH"))
        .and(path("/graph/me/events/AAMkAD-7"))
        .and(header("Authorization", "Bearer graph-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "AAMkAD-7"})))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let patch = EventPatch {
        description: Some("Bring photo ID".to_string()),
        ..Default::default()
    };
    let result = ctx
        .hosts
        .update_meeting("staff-3", "outlook", "AAMkAD-7", &patch)
        .await;
    assert!(result.success, "{:?}", result.error);
}

#[tokio::test]
async fn test_connect_and_disconnect() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "graph-access",
            "refresh_token": "graph-refresh",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let provider = ctx.hosts.connect("outlook", "staff-4", "code-1").await.unwrap();
    assert_eq!(provider, Provider::Outlook);
    assert!(ctx.store.get("staff-4", Provider::Outlook).await.unwrap().is_some());

    assert!(ctx.hosts.disconnect("outlook", "staff-4").await.unwrap());
    assert!(!ctx.hosts.disconnect("outlook", "staff-4").await.unwrap());
    assert!(ctx.store.is_empty());
}

#[tokio::test]
async fn test_concurrent_syncs_for_one_host_refresh_once() {
    let ctx = TestContext::new().await;
    ctx.store
        .put("staff-5", &google_token("access-1", past_expiry()))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/calendar/v3/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "evt-1"})))
        .expect(2)
        .mount(&ctx.server)
        .await;

    let event = sample_event();
    let (a, b) = tokio::join!(
        ctx.hosts.sync_meeting("staff-5", "google", "meeting-a", &event),
        ctx.hosts.sync_meeting("staff-5", "google", "meeting-b", &event),
    );

    assert!(a.success && b.success);
    assert_eq!(
        a.updated_token.is_some() as u8 + b.updated_token.is_some() as u8,
        1
    );
}
