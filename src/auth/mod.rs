//! OpenID Connect authentication
//!
//! Handles:
//! - Authorization code flow with the identity provider
//! - Signed cookie sessions
//! - Session gate extractors and middleware
//! - CSRF cookie

mod csrf;
mod middleware;
mod oauth;
pub mod oidc;
pub mod session;

pub use csrf::{CSRF_COOKIE, CSRF_HEADER, csrf_protect};
pub use middleware::{CurrentSession, CurrentUser, MaybeUser, load_session, session_from_headers};
pub use oauth::auth_router;
pub use oidc::Provider;
pub use session::{Claims, Session, create_session_token, verify_session_token};
