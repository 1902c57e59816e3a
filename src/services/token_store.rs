// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence contract for per-staff calendar tokens.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::models::{CalendarToken, Provider};

/// Where the meeting layer keeps each staff member's calendar credentials.
///
/// Implementations store the token blob as-is; at most one token per
/// (staff member, provider).
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, staff_id: &str, provider: Provider)
        -> anyhow::Result<Option<CalendarToken>>;

    /// Insert or replace the token for `staff_id` and the token's provider.
    async fn put(&self, staff_id: &str, token: &CalendarToken) -> anyhow::Result<()>;

    /// Returns true if a token was removed.
    async fn remove(&self, staff_id: &str, provider: Provider) -> anyhow::Result<bool>;
}

/// Process-local token store holding serialized blobs.
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    blobs: Arc<DashMap<(String, Provider), String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(
        &self,
        staff_id: &str,
        provider: Provider,
    ) -> anyhow::Result<Option<CalendarToken>> {
        let blob = match self.blobs.get(&(staff_id.to_string(), provider)) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };
        Ok(Some(CalendarToken::from_json(&blob)?))
    }

    async fn put(&self, staff_id: &str, token: &CalendarToken) -> anyhow::Result<()> {
        self.blobs
            .insert((staff_id.to_string(), token.provider()), token.to_json());
        Ok(())
    }

    async fn remove(&self, staff_id: &str, provider: Provider) -> anyhow::Result<bool> {
        Ok(self
            .blobs
            .remove(&(staff_id.to_string(), provider))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutlookToken;

    fn outlook(access: &str) -> CalendarToken {
        CalendarToken::Outlook(OutlookToken {
            access_token: access.to_string(),
            refresh_token: "r".to_string(),
            expiry_epoch_millis: 1,
            scope: "offline_access Calendars.ReadWrite".to_string(),
        })
    }

    #[tokio::test]
    async fn put_get_remove() {
        let store = InMemoryTokenStore::new();
        assert!(store.get("staff-1", Provider::Outlook).await.unwrap().is_none());

        store.put("staff-1", &outlook("a1")).await.unwrap();
        store.put("staff-1", &outlook("a2")).await.unwrap();
        assert_eq!(store.len(), 1);

        let token = store.get("staff-1", Provider::Outlook).await.unwrap();
        assert_eq!(token, Some(outlook("a2")));
        assert!(store.get("staff-1", Provider::Google).await.unwrap().is_none());

        assert!(store.remove("staff-1", Provider::Outlook).await.unwrap());
        assert!(!store.remove("staff-1", Provider::Outlook).await.unwrap());
        assert!(store.is_empty());
    }
}
