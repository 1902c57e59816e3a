// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Uniform result envelope returned by every sync operation.

use serde::{Deserialize, Serialize};

use super::CalendarToken;

/// Outcome of a sync, update or delete, regardless of provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Provider tag as requested by the caller
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Refreshed credentials the caller must persist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_token: Option<CalendarToken>,
}

impl SyncResult {
    pub fn ok(
        provider: impl Into<String>,
        event_id: Option<String>,
        updated_token: Option<CalendarToken>,
    ) -> Self {
        Self {
            success: true,
            event_id,
            provider: provider.into(),
            error: None,
            updated_token,
        }
    }

    pub fn failed(provider: impl Into<String>, error: impl ToString) -> Self {
        Self {
            success: false,
            event_id: None,
            provider: provider.into(),
            error: Some(error.to_string()),
            updated_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_envelope_omits_empty_fields() {
        let result = SyncResult::failed("custom", "not yet implemented");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "provider": "custom",
                "error": "not yet implemented"
            })
        );
    }

    #[test]
    fn ok_envelope_carries_event_id() {
        let result = SyncResult::ok("google", Some("evt_1".to_string()), None);
        assert!(result.success);
        assert_eq!(result.event_id.as_deref(), Some("evt_1"));
        assert!(result.error.is_none());
    }
}
