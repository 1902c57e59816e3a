// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a UTC timestamp without an offset, for APIs that take the zone separately.
pub fn format_utc_naive(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Current time as milliseconds since the Unix epoch.
pub fn now_epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Access-token lifetime assumed when the token endpoint omits or garbles it.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 60 * 60;

/// Longest access-token lifetime we trust from a token endpoint (one day).
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Absolute expiry (epoch millis) for a token that lives `expires_in` seconds from now.
///
/// Non-positive values fall back to `DEFAULT_TOKEN_LIFETIME_SECS`; anything
/// above `MAX_TOKEN_LIFETIME_SECS` is capped.
pub fn expiry_from_expires_in(expires_in: i64) -> i64 {
    let lifetime_secs = if expires_in <= 0 {
        DEFAULT_TOKEN_LIFETIME_SECS
    } else {
        expires_in.min(MAX_TOKEN_LIFETIME_SECS)
    };
    now_epoch_millis().saturating_add(lifetime_secs * 1000)
}
