// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar providers and their per-provider OAuth credentials.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CalendarError;

/// External calendar vendor a staff member can connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Outlook,
    /// Reserved for a future self-hosted calendar backend.
    Custom,
}

impl Provider {
    /// Tag used in URLs, stored blobs and result envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Outlook => "outlook",
            Provider::Custom => "custom",
        }
    }

    /// Human-readable name for error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Google => "Google Calendar",
            Provider::Outlook => "Outlook Calendar",
            Provider::Custom => "Custom calendar",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "outlook" | "microsoft" => Ok(Provider::Outlook),
            "custom" => Ok(Provider::Custom),
            other => Err(CalendarError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Google OAuth credentials for one staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleToken {
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token expires (milliseconds since epoch)
    pub expiry_epoch_millis: i64,
    pub scope: String,
    pub token_type: String,
}

/// Microsoft identity platform credentials for one staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlookToken {
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token expires (milliseconds since epoch)
    pub expiry_epoch_millis: i64,
    pub scope: String,
}

/// Provider-specific token blob, tagged with the provider it was issued by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum CalendarToken {
    Google(GoogleToken),
    Outlook(OutlookToken),
}

impl CalendarToken {
    /// Parse a token blob as persisted by the meeting layer.
    pub fn from_json(blob: &str) -> Result<Self, CalendarError> {
        serde_json::from_str(blob)
            .map_err(|e| CalendarError::InvalidCredentials(format!("malformed token blob: {e}")))
    }

    /// Serialize for persistence.
    pub fn to_json(&self) -> String {
        // Plain structs of strings and integers always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn provider(&self) -> Provider {
        match self {
            CalendarToken::Google(_) => Provider::Google,
            CalendarToken::Outlook(_) => Provider::Outlook,
        }
    }

    pub fn access_token(&self) -> &str {
        match self {
            CalendarToken::Google(t) => &t.access_token,
            CalendarToken::Outlook(t) => &t.access_token,
        }
    }

    pub fn expiry_epoch_millis(&self) -> i64 {
        match self {
            CalendarToken::Google(t) => t.expiry_epoch_millis,
            CalendarToken::Outlook(t) => t.expiry_epoch_millis,
        }
    }

    /// True if the access token is expired or expires within `margin_millis`.
    pub fn is_expired(&self, now_millis: i64, margin_millis: i64) -> bool {
        self.expiry_epoch_millis() <= now_millis + margin_millis
    }

    /// Check the token was issued by `expected` and carries an access token.
    pub fn validate_for(&self, expected: Provider) -> Result<(), CalendarError> {
        if self.provider() != expected {
            return Err(CalendarError::InvalidCredentials(format!(
                "token was issued by {}, not {}",
                self.provider(),
                expected
            )));
        }
        if self.access_token().trim().is_empty() {
            return Err(CalendarError::InvalidCredentials(
                "access token is empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<GoogleToken> for CalendarToken {
    fn from(token: GoogleToken) -> Self {
        CalendarToken::Google(token)
    }
}

impl From<OutlookToken> for CalendarToken {
    fn from(token: OutlookToken) -> Self {
        CalendarToken::Outlook(token)
    }
}
