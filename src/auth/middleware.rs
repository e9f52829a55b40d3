//! Session gate
//!
//! Loads the session once per request and gates protected routes.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::session::{Claims, SESSION_COOKIE, Session, verify_session_token};
use crate::AppState;
use crate::error::AppError;

/// Decode the session cookie, falling back to an empty session when the
/// cookie is absent, tampered with or expired.
pub fn session_from_headers(headers: &HeaderMap, secret: &str) -> Session {
    let jar = CookieJar::from_headers(headers);
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Session::default();
    };

    match verify_session_token(cookie.value(), secret) {
        Ok(session) => session,
        Err(error) => {
            tracing::debug!(%error, "Ignoring invalid session cookie");
            Session::default()
        }
    }
}

/// Middleware placing the request's [`Session`] in request extensions
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .route("/home", ...)
///     .layer(middleware::from_fn_with_state(state, load_session));
/// ```
pub async fn load_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = session_from_headers(request.headers(), &state.config.auth.session_secret);
    request.extensions_mut().insert(session);
    next.run(request).await
}

fn session_from_parts(parts: &mut Parts, state: &AppState) -> Session {
    if let Some(session) = parts.extensions.get::<Session>() {
        return session.clone();
    }

    let session = session_from_headers(&parts.headers, &state.config.auth.session_secret);
    parts.extensions.insert(session.clone());
    session
}

/// Extractor for the whole session, authenticated or not
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(CurrentSession(session_from_parts(parts, &app_state)))
    }
}

/// Extractor for the authenticated user's claims
///
/// Rejects with 401 when the session holds no user.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(claims): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {:?}", claims.get("preferred_username"))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        session_from_parts(parts, &app_state)
            .user
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of error.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Claims>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(MaybeUser(session_from_parts(parts, &app_state).user))
    }
}
