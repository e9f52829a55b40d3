//! Portal pages

use axum::{Json, Router, extract::State, response::Html, routing::get};
use serde_json::{Value, json};

use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::{AppError, Result};
use crate::templates::PageContext;

/// Create pages router
///
/// Routes:
/// - GET / - Landing page
/// - GET /home - Signed-in home page
/// - GET /contact, /profile, /settings, /help - Not yet available
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/home", get(home))
        .route("/contact", get(contact))
        .route("/profile", get(profile))
        .route("/settings", get(settings))
        .route("/help", get(help))
}

/// GET /
async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Html<String>> {
    state.templates.render(
        "index",
        &PageContext::new(&state.config.portal.base_path, user.as_ref()),
    )
}

/// GET /home
async fn home(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>> {
    state.templates.render(
        "home",
        &PageContext::new(&state.config.portal.base_path, Some(&user)),
    )
}

async fn contact() -> AppError {
    AppError::NotImplemented("Contacto en desarrollo".to_string())
}

async fn profile(_user: CurrentUser) -> AppError {
    AppError::NotImplemented("Perfil en desarrollo".to_string())
}

async fn settings(_user: CurrentUser) -> AppError {
    AppError::NotImplemented("Configuración en desarrollo".to_string())
}

async fn help(_user: CurrentUser) -> AppError {
    AppError::NotImplemented("Ayuda en desarrollo".to_string())
}

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Fallback for every unknown route
pub async fn not_found() -> AppError {
    AppError::NotFound
}
