// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Calendar provider credentials are optional: a deployment may enable only
//! Google or only Outlook. Missing credentials surface as a "not configured"
//! error when that provider is used, not at startup.

use std::env;

/// OAuth client registration for one calendar provider.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with the provider
    pub redirect_uri: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Public base URL of this service (used to derive default callback URLs)
    pub api_url: String,
    /// Frontend URL for post-OAuth redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    /// Google Calendar OAuth client, if configured
    pub google: Option<OAuthClientConfig>,
    /// Microsoft identity platform OAuth client, if configured
    pub outlook: Option<OAuthClientConfig>,
    /// Azure AD tenant for Outlook sign-in
    pub outlook_tenant: String,

    /// HMAC key for signing OAuth state parameters (raw bytes)
    pub oauth_state_key: Vec<u8>,
    /// HS256 key shared with the main app, which issues staff session JWTs
    pub session_jwt_key: Vec<u8>,
}

impl Config {
    /// Config for tests: both providers configured with dummy credentials.
    pub fn test_default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            google: Some(OAuthClientConfig {
                client_id: "test-google-client".to_string(),
                client_secret: "test-google-secret".to_string(),
                redirect_uri: "http://localhost:8080/calendar/google/callback".to_string(),
            }),
            outlook: Some(OAuthClientConfig {
                client_id: "test-outlook-client".to_string(),
                client_secret: "test-outlook-secret".to_string(),
                redirect_uri: "http://localhost:8080/calendar/outlook/callback".to_string(),
            }),
            outlook_tenant: "common".to_string(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
            session_jwt_key: b"test_session_key_32_bytes_minimum".to_vec(),
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_url = env::var("API_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let oauth_state_key = secret_key_from_env("OAUTH_STATE_KEY")?;
        let session_jwt_key = secret_key_from_env("SESSION_JWT_KEY")?;

        Ok(Self {
            google: oauth_client_from_env("GOOGLE", &api_url, "google"),
            outlook: oauth_client_from_env("OUTLOOK", &api_url, "outlook"),
            outlook_tenant: env::var("OUTLOOK_TENANT_ID")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| "common".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            api_url,
            oauth_state_key,
            session_jwt_key,
        })
    }
}

/// Read a required signing key of at least 32 bytes.
fn secret_key_from_env(name: &'static str) -> Result<Vec<u8>, ConfigError> {
    let key = env::var(name)
        .map_err(|_| ConfigError::Missing(name))?
        .into_bytes();
    if key.len() < 32 {
        return Err(ConfigError::Invalid(name, "must be at least 32 bytes".to_string()));
    }
    Ok(key)
}

/// Read `{PREFIX}_CLIENT_ID`, `{PREFIX}_CLIENT_SECRET` and `{PREFIX}_REDIRECT_URI`.
///
/// Returns `None` unless both the id and the secret are set and non-empty.
fn oauth_client_from_env(prefix: &str, api_url: &str, provider: &str) -> Option<OAuthClientConfig> {
    let read = |suffix: &str| {
        env::var(format!("{prefix}_{suffix}"))
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let client_id = read("CLIENT_ID")?;
    let client_secret = read("CLIENT_SECRET")?;
    let redirect_uri = read("REDIRECT_URI")
        .unwrap_or_else(|| format!("{api_url}/calendar/{provider}/callback"));

    Some(OAuthClientConfig {
        client_id,
        client_secret,
        redirect_uri,
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
