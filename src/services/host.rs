// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meeting-layer glue: load a host's token, call the facade, persist any
//! refreshed token.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{AppError, CalendarError};
use crate::models::{CalendarEvent, CalendarToken, EventPatch, Provider, SyncResult};

use super::calendar::CalendarSyncService;
use super::token_store::TokenStore;

/// Per-staff locks serializing calendar calls for the same host.
pub type StaffLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

#[derive(Clone)]
pub struct HostCalendarService {
    calendar: Arc<CalendarSyncService>,
    store: Arc<dyn TokenStore>,
    locks: StaffLocks,
}

impl HostCalendarService {
    pub fn new(calendar: Arc<CalendarSyncService>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            calendar,
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    fn lock_for(&self, staff_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(staff_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ─── Connection ──────────────────────────────────────────────────────────

    /// Complete an OAuth callback: exchange `code` and store the token.
    pub async fn connect(
        &self,
        provider: &str,
        staff_id: &str,
        code: &str,
    ) -> Result<Provider, AppError> {
        let token = self
            .calendar
            .exchange_calendar_code_for_tokens(provider, code)
            .await?;
        let provider = token.provider();

        let lock = self.lock_for(staff_id);
        let _guard = lock.lock().await;
        self.store.put(staff_id, &token).await?;

        tracing::info!(staff_id, provider = %provider, "Calendar connected");
        Ok(provider)
    }

    /// Forget the stored token. Returns false if none was stored.
    pub async fn disconnect(&self, provider: &str, staff_id: &str) -> Result<bool, AppError> {
        let provider: Provider = provider.parse()?;

        let lock = self.lock_for(staff_id);
        let _guard = lock.lock().await;
        let removed = self.store.remove(staff_id, provider).await?;

        tracing::info!(staff_id, provider = %provider, removed, "Calendar disconnected");
        Ok(removed)
    }

    // ─── Meeting sync ────────────────────────────────────────────────────────

    /// Create the host's calendar event for a meeting.
    ///
    /// `meeting_id` doubles as the idempotency key, so retrying after a lost
    /// response does not create a second event.
    pub async fn sync_meeting(
        &self,
        staff_id: &str,
        provider: &str,
        meeting_id: &str,
        event: &CalendarEvent,
    ) -> SyncResult {
        let lock = self.lock_for(staff_id);
        let _guard = lock.lock().await;

        let token = match self.load_token(staff_id, provider).await {
            Ok(token) => token,
            Err(result) => return result,
        };
        let result = self
            .calendar
            .sync_meeting_to_calendar(provider, &token, event, Some(meeting_id))
            .await;
        self.persist_refreshed(staff_id, &result).await;
        result
    }

    pub async fn update_meeting(
        &self,
        staff_id: &str,
        provider: &str,
        event_id: &str,
        patch: &EventPatch,
    ) -> SyncResult {
        let lock = self.lock_for(staff_id);
        let _guard = lock.lock().await;

        let token = match self.load_token(staff_id, provider).await {
            Ok(token) => token,
            Err(result) => return result,
        };
        let result = self
            .calendar
            .update_meeting_in_calendar(provider, &token, event_id, patch)
            .await;
        self.persist_refreshed(staff_id, &result).await;
        result
    }

    /// Remove the host's calendar event. A failure here never blocks the
    /// local meeting deletion; it is only logged.
    pub async fn delete_meeting(
        &self,
        staff_id: &str,
        provider: &str,
        event_id: &str,
    ) -> SyncResult {
        let lock = self.lock_for(staff_id);
        let _guard = lock.lock().await;

        let token = match self.load_token(staff_id, provider).await {
            Ok(token) => token,
            Err(result) => return result,
        };
        let result = self
            .calendar
            .delete_meeting_from_calendar(provider, &token, event_id)
            .await;
        self.persist_refreshed(staff_id, &result).await;

        if !result.success {
            tracing::warn!(
                staff_id,
                provider,
                event_id,
                error = result.error.as_deref().unwrap_or(""),
                "Calendar event not removed; continuing with local deletion"
            );
        }
        result
    }

    async fn load_token(&self, staff_id: &str, provider: &str) -> Result<CalendarToken, SyncResult> {
        let tag = provider.trim().to_ascii_lowercase();
        let resolved = CalendarSyncService::resolve_provider(provider)
            .map_err(|e| SyncResult::failed(tag.clone(), e))?;

        match self.store.get(staff_id, resolved).await {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(SyncResult::failed(
                tag,
                CalendarError::NotConnected(resolved),
            )),
            Err(e) => {
                tracing::error!(staff_id, provider = %resolved, error = ?e, "Failed to load calendar token");
                Err(SyncResult::failed(tag, format!("Failed to load calendar token: {}", e)))
            }
        }
    }

    /// Store a rotated token. Caller holds the staff lock.
    async fn persist_refreshed(&self, staff_id: &str, result: &SyncResult) {
        let Some(token) = &result.updated_token else {
            return;
        };
        match self.store.put(staff_id, token).await {
            Ok(()) => tracing::debug!(staff_id, provider = %token.provider(), "Stored refreshed calendar token"),
            Err(e) => tracing::error!(
                staff_id,
                provider = %token.provider(),
                error = ?e,
                "Failed to store refreshed calendar token"
            ),
        }
    }
}
