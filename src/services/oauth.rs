// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared OAuth token-endpoint and vendor-response handling.
//!
//! Google and Microsoft both speak RFC 6749 at their token endpoints and
//! report API failures as `{"error": {"message": ...}}`, so the adapters
//! share the form posts and error decoding here.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::CalendarError;
use crate::models::Provider;

/// Token endpoint response for both `authorization_code` and `refresh_token` grants.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl OAuthTokenResponse {
    /// The refresh token, if the provider issued a non-empty one.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

/// POST a form to an OAuth token endpoint.
pub(crate) async fn post_token_form(
    http: &reqwest::Client,
    provider: Provider,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<OAuthTokenResponse, CalendarError> {
    let response = http
        .post(token_url)
        .form(form)
        .send()
        .await
        .map_err(|e| {
            CalendarError::api(provider, None, format!("Token request failed: {}", e))
        })?;

    json_body(provider, response).await
}

/// Return the response if successful, otherwise a decoded vendor error.
pub(crate) async fn check_response(
    provider: Provider,
    response: reqwest::Response,
) -> Result<reqwest::Response, CalendarError> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(vendor_error(provider, response).await)
}

/// Check response status and parse JSON body.
pub(crate) async fn json_body<T: DeserializeOwned>(
    provider: Provider,
    response: reqwest::Response,
) -> Result<T, CalendarError> {
    let response = check_response(provider, response).await?;
    response
        .json()
        .await
        .map_err(|e| CalendarError::api(provider, None, format!("JSON parse error: {}", e)))
}

/// Vendor error payloads: API errors carry an object, OAuth errors a code string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VendorErrorBody {
    Api {
        error: ApiErrorDetail,
    },
    OAuth {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Build a `CalendarError::Api` from a failed response, passing the vendor message through.
pub(crate) async fn vendor_error(provider: Provider, response: reqwest::Response) -> CalendarError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(%provider, "Calendar provider rate limit hit (429)");
        return CalendarError::api(provider, Some(429), CalendarError::RATE_LIMITED);
    }

    CalendarError::api(provider, Some(status.as_u16()), vendor_message(status, &body))
}

fn vendor_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<VendorErrorBody>(body) {
        Ok(VendorErrorBody::Api { error }) => error.message,
        Ok(VendorErrorBody::OAuth {
            error,
            error_description: Some(description),
        }) => format!("{}: {}", error, description),
        Ok(VendorErrorBody::OAuth { error, .. }) => error,
        Err(_) if body.trim().is_empty() => format!("HTTP {}", status),
        Err(_) => format!("HTTP {}: {}", status, body),
    }
}
