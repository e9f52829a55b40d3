//! OpenID Connect login flow
//!
//! Implements the authorization code flow with the configured provider.

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::middleware::CurrentSession;
use super::session::{clear_session_cookie, create_session_token, session_cookie};
use crate::AppState;
use crate::error::{AppError, Result};
use crate::metrics::OIDC_HANDSHAKES_TOTAL;

/// Create authentication router
///
/// Routes:
/// - GET /login - Redirect to the provider
/// - GET /callback - Authorization code callback
/// - GET /logout - Clear session and end the provider session
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
}

// =============================================================================
// Login
// =============================================================================

/// GET /login
///
/// Already signed in users go straight home; everybody else is sent to the
/// provider's authorization endpoint.
async fn login(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Redirect {
    if session.is_authenticated() {
        return Redirect::temporary(&state.config.portal.home_url());
    }

    Redirect::temporary(state.provider.authorization_url().as_str())
}

// =============================================================================
// Callback
// =============================================================================

/// Query parameters from the provider callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// Error code when the provider refused the request
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /callback
///
/// # Steps
/// 1. Reject provider errors and missing codes
/// 2. Exchange code for access token
/// 3. Fetch user info
/// 4. Store claims and token in the session cookie
/// 5. Redirect to home
async fn callback(
    State(state): State<AppState>,
    query: std::result::Result<Query<CallbackQuery>, QueryRejection>,
    CurrentSession(mut session): CurrentSession,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    let Query(query) = query.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    if let Some(error) = query.error {
        let detail = match query.error_description {
            Some(description) => format!("{error}: {description}"),
            None => error,
        };
        return Err(AppError::Authorization(detail));
    }

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::Validation("Missing authorization code".to_string()))?;

    let handshake = state.provider.handshake()?;
    let authenticated = match handshake.complete(&code).await {
        Ok(authenticated) => {
            OIDC_HANDSHAKES_TOTAL.with_label_values(&["success"]).inc();
            authenticated
        }
        Err(error) => {
            OIDC_HANDSHAKES_TOTAL
                .with_label_values(&[error.error_type()])
                .inc();
            return Err(error);
        }
    };

    tracing::info!(
        subject = authenticated
            .user
            .get("sub")
            .and_then(|sub| sub.as_str())
            .unwrap_or("unknown"),
        "User signed in"
    );

    session.establish(authenticated.user, authenticated.access_token);
    let token = create_session_token(
        &session,
        &state.config.auth.session_secret,
        state.config.auth.session_max_age,
    )?;

    Ok((
        jar.add(session_cookie(
            token,
            state.config.uses_secure_cookies(),
            state.config.auth.session_max_age,
        )),
        Redirect::temporary(&state.config.portal.home_url()),
    ))
}

// =============================================================================
// Logout
// =============================================================================

/// GET /logout
///
/// Clears the session cookie. If the session held an access token the
/// browser is sent to the provider's logout endpoint, otherwise home.
async fn logout(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    jar: CookieJar,
) -> Response {
    let had_token = session.access_token.is_some();
    session.clear();

    let target = if had_token {
        state.provider.logout_url().to_string()
    } else {
        state.config.portal.root_url()
    };

    tracing::info!(provider_logout = had_token, "User signed out");

    (
        StatusCode::FOUND,
        jar.add(clear_session_cookie()),
        [(LOCATION, target)],
    )
        .into_response()
}
