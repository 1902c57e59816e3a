// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types: calendar provider failures and HTTP API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::Provider;

/// Failures raised by the provider adapters.
///
/// The sync facade converts these into `SyncResult` envelopes; only the
/// OAuth helpers (auth URL, code exchange) return them directly.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CalendarError {
    #[error("{} integration is not configured (missing client credentials)", .0.display_name())]
    NotConfigured(Provider),

    #[error("Failed to get refresh token from {}; please re-authorize calendar access", .0.display_name())]
    MissingRefreshToken(Provider),

    #[error("{} access has expired; please reconnect your calendar", .0.display_name())]
    ReconnectRequired(Provider),

    #[error("{} is not connected; connect your calendar first", .0.display_name())]
    NotConnected(Provider),

    #[error("Invalid calendar credentials: {0}")]
    InvalidCredentials(String),

    #[error("Unsupported calendar provider: {0}")]
    UnsupportedProvider(String),

    #[error("{0} calendar provider is not yet implemented")]
    NotImplemented(String),

    #[error("Invalid calendar event: {0}")]
    InvalidEvent(String),

    #[error("{} API error: {message}", .provider.display_name())]
    Api {
        provider: Provider,
        status: Option<u16>,
        message: String,
    },
}

impl CalendarError {
    pub const RATE_LIMITED: &'static str = "rate limit exceeded";

    /// Vendor API failure with an optional HTTP status.
    pub fn api(provider: Provider, status: Option<u16>, message: impl Into<String>) -> Self {
        CalendarError::Api {
            provider,
            status,
            message: message.into(),
        }
    }

    /// True if the staff member must go through the consent flow again.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(
            self,
            CalendarError::MissingRefreshToken(_) | CalendarError::ReconnectRequired(_)
        ) || matches!(self, CalendarError::Api { status: Some(401), .. })
    }

    /// True for vendor rate limiting (HTTP 429).
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CalendarError::Api { status: Some(429), .. })
    }

    /// Short machine-readable category for logs and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CalendarError::NotConfigured(_) => "not_configured",
            CalendarError::MissingRefreshToken(_) | CalendarError::ReconnectRequired(_) => {
                "reauthorization_required"
            }
            CalendarError::NotConnected(_) => "not_connected",
            CalendarError::InvalidCredentials(_) => "invalid_credentials",
            CalendarError::UnsupportedProvider(_) => "unsupported_provider",
            CalendarError::NotImplemented(_) => "not_implemented",
            CalendarError::InvalidEvent(_) => "invalid_event",
            CalendarError::Api { .. } => "calendar_api_error",
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Calendar(err) => {
                let status = match err {
                    CalendarError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
                    CalendarError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
                    CalendarError::UnsupportedProvider(_) | CalendarError::InvalidEvent(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    CalendarError::NotConnected(_) => StatusCode::NOT_FOUND,
                    CalendarError::MissingRefreshToken(_)
                    | CalendarError::ReconnectRequired(_)
                    | CalendarError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
                    CalendarError::Api { .. } => {
                        tracing::warn!(error = %err, "Calendar provider error");
                        StatusCode::BAD_GATEWAY
                    }
                };
                (status, err.kind(), Some(err.to_string()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_actionable_phrases() {
        assert!(CalendarError::NotConfigured(Provider::Google)
            .to_string()
            .contains("not configured"));
        assert!(CalendarError::MissingRefreshToken(Provider::Google)
            .to_string()
            .contains("Failed to get refresh token"));
        assert!(CalendarError::ReconnectRequired(Provider::Outlook)
            .to_string()
            .contains("reconnect"));
        assert!(CalendarError::NotImplemented("custom".to_string())
            .to_string()
            .contains("not yet implemented"));
    }

    #[test]
    fn api_error_passes_vendor_message_through() {
        let err = CalendarError::api(Provider::Outlook, Some(404), "The specified object was not found in the store.");
        assert_eq!(
            err.to_string(),
            "Outlook Calendar API error: The specified object was not found in the store."
        );
    }

    #[test]
    fn reauthorization_classification() {
        assert!(CalendarError::ReconnectRequired(Provider::Outlook).requires_reauthorization());
        assert!(CalendarError::MissingRefreshToken(Provider::Google).requires_reauthorization());
        assert!(CalendarError::api(Provider::Google, Some(401), "Invalid Credentials")
            .requires_reauthorization());
        assert!(!CalendarError::api(Provider::Google, Some(500), "Backend Error")
            .requires_reauthorization());
        assert!(!CalendarError::NotConfigured(Provider::Google).requires_reauthorization());
    }

    #[test]
    fn rate_limit_classification() {
        assert!(CalendarError::api(Provider::Google, Some(429), CalendarError::RATE_LIMITED)
            .is_rate_limited());
        assert!(!CalendarError::api(Provider::Google, None, "timeout").is_rate_limited());
    }

    #[test]
    fn calendar_errors_map_to_http_status() {
        let response =
            AppError::from(CalendarError::NotConfigured(Provider::Google)).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response =
            AppError::from(CalendarError::UnsupportedProvider("yahoo".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::from(CalendarError::api(Provider::Google, Some(500), "boom"))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
