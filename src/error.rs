//! Error types for the portal
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse`. The response carries an [`ErrorPage`]
//! extension so the error page middleware can render it with the
//! shared template.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Authentication required (401)
    #[error("Not authenticated")]
    Unauthorized,

    /// Access denied (403)
    #[error("Access denied")]
    Forbidden,

    /// Malformed request (400)
    #[error("{0}")]
    Validation(String),

    /// Provider rejected the authorization code (400)
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// Token response carried no access token (400)
    #[error("No access token received")]
    MissingAccessToken,

    /// Provider rejected the access token at the user-info endpoint (400)
    #[error("Failed to get user info: {0}")]
    UserInfo(String),

    /// Provider redirected back with an error instead of a code (400)
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// Provider did not answer in time (504)
    #[error("Timeout connecting to the identity provider")]
    UpstreamTimeout,

    /// Provider could not be reached (502)
    #[error("Connection error: {0}")]
    UpstreamConnection(String),

    /// Provider answered with something that is not what the protocol promises (502)
    #[error("Invalid response from the identity provider: {0}")]
    UpstreamResponse(String),

    /// Template rendering error (500)
    #[error("Template error: {0}")]
    Template(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encryption/signing error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    /// Not implemented (501)
    #[error("{0}")]
    NotImplemented(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::UpstreamTimeout
        } else if err.is_decode() {
            AppError::UpstreamResponse(err.to_string())
        } else {
            AppError::UpstreamConnection(err.to_string())
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_)
            | AppError::TokenExchange(_)
            | AppError::MissingAccessToken
            | AppError::UserInfo(_)
            | AppError::Authorization(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::UpstreamConnection(_) | AppError::UpstreamResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::Template(_)
            | AppError::Config(_)
            | AppError::Encryption(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::Validation(_) => "validation",
            AppError::TokenExchange(_) => "token_exchange",
            AppError::MissingAccessToken => "missing_access_token",
            AppError::UserInfo(_) => "user_info",
            AppError::Authorization(_) => "authorization",
            AppError::UpstreamTimeout => "upstream_timeout",
            AppError::UpstreamConnection(_) => "upstream_connection",
            AppError::UpstreamResponse(_) => "upstream_response",
            AppError::Template(_) => "template",
            AppError::Config(_) => "config",
            AppError::Encryption(_) => "encryption",
            AppError::Internal(_) => "internal",
            AppError::NotImplemented(_) => "not_implemented",
        }
    }

    /// Detail safe to show to the browser, if any.
    ///
    /// Server-side failures never expose their cause.
    pub fn public_detail(&self) -> Option<String> {
        match self {
            AppError::NotFound | AppError::Unauthorized | AppError::Forbidden => None,
            AppError::Template(_)
            | AppError::Config(_)
            | AppError::Encryption(_)
            | AppError::Internal(_) => None,
            _ => Some(self.to_string()),
        }
    }
}

/// Marker attached to error responses, consumed by the error page renderer
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub detail: Option<String>,
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// The plain-text body is a fallback; the error page middleware replaces
    /// it with the rendered template.
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[self.error_type()])
            .inc();

        let detail = self.public_detail();
        let (title, _) = error_message(status);
        let mut response = (status, title).into_response();
        response.extensions_mut().insert(ErrorPage { detail });
        response
    }
}

/// Localized title and message shown on the error page for a status code
pub fn error_message(status: StatusCode) -> (&'static str, &'static str) {
    match status.as_u16() {
        400 => (
            "Solicitud Incorrecta",
            "La solicitud no pudo ser procesada debido a un error del cliente.",
        ),
        401 => (
            "No Autorizado",
            "Debe iniciar sesión para acceder a este recurso.",
        ),
        403 => (
            "Acceso Denegado",
            "No tiene permisos para acceder a este recurso.",
        ),
        404 => ("Página No Encontrada", "El recurso solicitado no existe."),
        405 => (
            "Método No Permitido",
            "El método HTTP utilizado no está permitido para este recurso.",
        ),
        408 => (
            "Tiempo de Espera Agotado",
            "La solicitud tardó demasiado tiempo en procesarse.",
        ),
        429 => (
            "Demasiadas Solicitudes",
            "Ha excedido el límite de solicitudes permitidas.",
        ),
        500 => (
            "Error Interno del Servidor",
            "Ocurrió un error en el servidor. Intente nuevamente más tarde.",
        ),
        501 => (
            "No Implementado",
            "Esta funcionalidad está en desarrollo.",
        ),
        502 => (
            "Error de Puerta de Enlace",
            "El servidor recibió una respuesta inválida.",
        ),
        503 => (
            "Servicio No Disponible",
            "El servicio está temporalmente fuera de servicio.",
        ),
        504 => (
            "Tiempo de Espera de Puerta de Enlace",
            "El servidor no respondió a tiempo.",
        ),
        _ => ("Error", "Ha ocurrido un error inesperado."),
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
