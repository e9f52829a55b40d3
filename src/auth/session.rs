//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AppError;

/// Name of the cookie carrying the signed session
pub const SESSION_COOKIE: &str = "session";

/// Unstructured user-info claims returned by the identity provider
pub type Claims = serde_json::Map<String, serde_json::Value>;

type HmacSha256 = Hmac<Sha256>;

/// Per-browser session state
///
/// Empty until the OIDC callback completes; cleared at logout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// User-info claims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Claims>,
    /// Access token issued by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Populate the session after a successful handshake
    pub fn establish(&mut self, user: Claims, access_token: String) {
        self.user = Some(user);
        self.access_token = Some(access_token);
    }

    pub fn clear(&mut self) {
        *self = Session::default();
    }
}

/// Signed payload: the session plus its validity window
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(flatten)]
    session: Session,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

fn new_mac(secret: &str) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AppError::Encryption(e.to_string()))
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
/// * `max_age` - Seconds until the token stops being accepted
pub fn create_session_token(
    session: &Session,
    secret: &str,
    max_age: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let envelope = Envelope {
        session: session.clone(),
        created_at: now,
        expires_at: now + Duration::seconds(max_age),
    };

    let payload = serde_json::to_string(&envelope).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = new_mac(secret)?;
    mac.update(payload_b64.as_bytes());
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// Returns `Unauthorized` if the signature is invalid, the token is
/// malformed, or the token has expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;

    let mut mac = new_mac(secret)?;
    mac.update(payload_b64.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let envelope: Envelope =
        serde_json::from_slice(&payload_bytes).map_err(|_| AppError::Unauthorized)?;

    if envelope.expires_at < Utc::now() {
        return Err(AppError::Unauthorized);
    }

    Ok(envelope.session)
}

/// Cookie carrying a freshly signed session
///
/// The browser keeps it for `max_age` seconds, the same window the signed
/// payload is accepted for.
pub fn session_cookie(token: String, secure: bool, max_age: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

/// Cookie that makes the browser drop its session
pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}
