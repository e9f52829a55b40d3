//! Portal - a small web portal behind an OpenID Connect provider
//!
//! # Architecture
//!
//! ```text
//! browser ──▶ Session Gate ──(anonymous)──▶ /login ──▶ identity provider
//!                 ▲                                         │
//!                 │                                    /callback?code=
//!                 │                                         ▼
//!                 └──── signed session cookie ◀── OIDC handshake client
//!                                                 (token + user-info)
//! ```
//!
//! # Modules
//!
//! - `api`: page handlers, error page rendering, health and metrics
//! - `auth`: OIDC handshake, signed cookie sessions, session gate, CSRF
//! - `templates`: Handlebars page templates
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod templates;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Immutable after startup; cloned for each request.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Registered page templates
    pub templates: Arc<templates::Templates>,

    /// Identity provider endpoints
    pub provider: Arc<auth::Provider>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Errors
    /// Returns error if templates fail to parse or provider endpoints are invalid
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let templates = templates::Templates::new()?;
        let provider = auth::Provider::new(&config.oidc)?;

        tracing::info!(
            realm = %config.oidc.realm,
            client_id = %config.oidc.client_id,
            "Application state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            templates: Arc::new(templates),
            provider: Arc::new(provider),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
///
/// Layers, innermost first: CSRF check, error page rendering, session
/// loading, request metrics, tracing.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, handler::HandlerWithoutStateExt, middleware};
    use tower_http::{services::ServeDir, trace::TraceLayer};

    let static_files = ServeDir::new(&state.config.portal.static_dir)
        .not_found_service(api::not_found.into_service());

    Router::new()
        .route("/health", axum::routing::get(api::health_check))
        .merge(auth::auth_router())
        .merge(api::pages_router())
        .merge(api::metrics_router())
        .nest_service("/static", static_files)
        .fallback(api::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::csrf_protect,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::render_error_pages,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::load_session,
        ))
        .layer(middleware::from_fn(api::record_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
