//! Double-submit CSRF cookie
//!
//! Every browser gets a random `csrf_token` cookie. Requests with unsafe
//! methods must echo it in the `X-CSRF-Token` header.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine;
use rand::RngCore;

use crate::AppState;
use crate::error::AppError;

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

fn generate_csrf_token() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Compare without short-circuiting on the first differing byte
fn tokens_match(expected: &str, presented: &str) -> bool {
    expected.len() == presented.len()
        && expected
            .bytes()
            .zip(presented.bytes())
            .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn build_csrf_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token))
        .path("/")
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Middleware enforcing the double-submit check and issuing the cookie
pub async fn csrf_protect(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let existing = CookieJar::from_headers(request.headers())
        .get(CSRF_COOKIE)
        .map(|cookie| cookie.value().to_owned());

    if !is_safe_method(request.method()) {
        let presented = request
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok());

        let verified = matches!(
            (existing.as_deref(), presented),
            (Some(expected), Some(presented)) if tokens_match(expected, presented)
        );
        if !verified {
            tracing::warn!(method = %request.method(), path = %request.uri().path(), "CSRF check failed");
            return AppError::Forbidden.into_response();
        }
    }

    let mut response = next.run(request).await;

    if existing.is_none() {
        let cookie = build_csrf_cookie(generate_csrf_token(), state.config.uses_secure_cookies());
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(error) => tracing::error!(%error, "Failed to encode CSRF cookie"),
        }
    }

    response
}
