// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar OAuth connect routes.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::AuthStaff;
use crate::AppState;

/// Vendor callback; the signed `state` identifies the staff member.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/calendar/{provider}/callback", get(connect_callback))
}

/// Routes acting on the signed-in staff member's own calendar.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/calendar/{provider}/connect", get(connect_start))
        .route("/calendar/{provider}/disconnect", post(disconnect))
}

/// Start OAuth flow - redirect the staff member to the vendor consent page.
async fn connect_start(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<AuthStaff>,
    Path(provider): Path<String>,
) -> Result<Redirect> {
    let auth_url = state
        .calendar
        .get_calendar_auth_url(&provider, &staff.staff_id)?;

    tracing::info!(
        provider = %provider,
        staff_id = %staff.staff_id,
        "Starting calendar OAuth flow"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange the code, store the token, return to settings.
///
/// Every outcome is a redirect back to the frontend; failures carry an
/// `error` query parameter instead of a JSON body.
async fn connect_callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let settings_url = format!(
        "{}/settings/calendar",
        state.config.frontend_url.trim_end_matches('/')
    );
    let fail = |error: &str| {
        Redirect::temporary(&format!(
            "{}?error={}",
            settings_url,
            urlencoding::encode(error)
        ))
    };

    if let Some(error) = params.error {
        tracing::warn!(provider = %provider, error = %error, "OAuth error from calendar provider");
        return fail(&error);
    }

    let Some(staff_id) = params
        .state
        .as_deref()
        .and_then(|s| state.calendar.decode_state(s))
    else {
        tracing::warn!(provider = %provider, "Invalid or expired OAuth state");
        return fail("invalid_state");
    };

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return fail("missing_code");
    };

    match state.hosts.connect(&provider, &staff_id, &code).await {
        Ok(connected) => Redirect::temporary(&format!(
            "{}?connected={}",
            settings_url,
            connected.as_str()
        )),
        Err(e) => {
            tracing::error!(provider = %provider, staff_id = %staff_id, error = %e, "Calendar connect failed");
            fail(callback_error_code(&e))
        }
    }
}

/// Short code for the frontend to pick a message; details stay in the logs.
fn callback_error_code(error: &AppError) -> &'static str {
    match error {
        AppError::Calendar(e) if e.is_rate_limited() => "rate_limited",
        AppError::Calendar(e) if e.requires_reauthorization() => "reauthorization_required",
        AppError::Calendar(e) => e.kind(),
        AppError::Internal(_) => "internal_error",
    }
}

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub disconnected: bool,
}

/// Forget the signed-in staff member's stored calendar token.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<AuthStaff>,
    Path(provider): Path<String>,
) -> Result<Json<DisconnectResponse>> {
    let disconnected = state.hosts.disconnect(&provider, &staff.staff_id).await?;
    Ok(Json(DisconnectResponse { disconnected }))
}
