//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (PORTAL__*)
//! 4. The flat deployment variables (KEYCLOAK_URL_PUBLIC, REDIRECT_URI, ...)

use config::{ConfigBuilder, builder::DefaultState};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

use crate::error::AppError;

/// Session secret used when nothing is configured. Only fit for local development.
pub const DEFAULT_SESSION_SECRET: &str = "your-secret-key-change-in-production";

/// Upper bound for `auth.session_max_age`: ten years
pub const MAX_SESSION_MAX_AGE: i64 = 10 * 365 * 24 * 60 * 60;

/// Flat environment variables understood by existing deployments, mapped to
/// their configuration keys. These win over every other source.
pub const DEPLOYMENT_ENV_KEYS: &[(&str, &str)] = &[
    ("KEYCLOAK_URL_PUBLIC", "oidc.public_url"),
    ("KEYCLOAK_URL_INTERNAL", "oidc.internal_url"),
    ("KEYCLOAK_REALM", "oidc.realm"),
    ("KEYCLOAK_CLIENT_ID", "oidc.client_id"),
    ("KEYCLOAK_CLIENT_SECRET", "oidc.client_secret"),
    ("REDIRECT_URI", "oidc.redirect_uri"),
    ("BASE_PATH", "portal.base_path"),
    ("SESSION_SECRET", "auth.session_secret"),
];

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub oidc: OidcConfig,
    pub portal: PortalConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8100)
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Identity provider configuration
///
/// The provider is addressed twice: `public_url` is what browsers can reach
/// (authorization and logout redirects), `internal_url` is what this server
/// uses for back-channel calls (token exchange and user-info).
#[derive(Debug, Clone, Deserialize)]
pub struct OidcConfig {
    pub public_url: String,
    pub internal_url: String,
    pub realm: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Callback URL registered with the provider
    pub redirect_uri: String,
    /// Space-delimited scopes requested at login
    pub scope: String,
    /// Timeout applied to each back-channel request
    pub timeout_seconds: u64,
}

impl OidcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Portal presentation settings
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    /// Prefix under which the portal is published (e.g. "/portal")
    pub base_path: String,
    /// Directory served under /static
    pub static_dir: PathBuf,
}

impl PortalConfig {
    pub fn home_url(&self) -> String {
        format!("{}/home", self.base_path)
    }

    pub fn root_url(&self) -> String {
        format!("{}/", self.base_path)
    }
}

/// Session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 1209600 = 14 days)
    pub session_max_age: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, AppError> {
        use config::{Environment, File};

        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("PORTAL")
                    .separator("__")
                    .try_parsing(true),
            );

        let builder = apply_deployment_env(builder, |name| std::env::var(name).ok())?;
        Self::build(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, AppError> {
        Ok(config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8100)?
            .set_default("oidc.public_url", "http://localhost:8080")?
            .set_default("oidc.internal_url", "http://keycloak:8080")?
            .set_default("oidc.realm", "portal")?
            .set_default("oidc.client_id", "portal-client")?
            .set_default("oidc.client_secret", "")?
            .set_default("oidc.redirect_uri", "http://localhost:8100/callback")?
            .set_default("oidc.scope", "openid profile email")?
            .set_default("oidc.timeout_seconds", 30)?
            .set_default("portal.base_path", "/portal")?
            .set_default("portal.static_dir", "static")?
            .set_default("auth.session_secret", DEFAULT_SESSION_SECRET)?
            .set_default("auth.session_max_age", 1_209_600)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, AppError> {
        let app_config: Self = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Cookies get the `Secure` attribute when the portal is served over https
    pub fn uses_secure_cookies(&self) -> bool {
        url::Url::parse(&self.oidc.redirect_uri)
            .map(|url| url.scheme().eq_ignore_ascii_case("https"))
            .unwrap_or(false)
    }

    /// Log settings that are acceptable for development but not production.
    pub fn report_insecure_settings(&self) {
        if self.auth.session_secret == DEFAULT_SESSION_SECRET {
            tracing::warn!("Using the built-in session secret; set SESSION_SECRET in production");
        }
        if !self.uses_secure_cookies() {
            tracing::warn!(
                redirect_uri = %self.oidc.redirect_uri,
                "Using insecure session cookies for a non-https redirect URI"
            );
        }
        if self.oidc.client_secret.is_empty() {
            tracing::warn!(client_id = %self.oidc.client_id, "No client secret configured");
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }
        if self.auth.session_max_age > MAX_SESSION_MAX_AGE {
            return Err(AppError::Config(format!(
                "auth.session_max_age must be at most {MAX_SESSION_MAX_AGE} seconds"
            )));
        }

        if self.oidc.timeout_seconds == 0 {
            return Err(AppError::Config(
                "oidc.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        for (key, value) in [
            ("oidc.public_url", &self.oidc.public_url),
            ("oidc.internal_url", &self.oidc.internal_url),
            ("oidc.redirect_uri", &self.oidc.redirect_uri),
        ] {
            url::Url::parse(value)
                .map_err(|e| AppError::Config(format!("{key} is not a valid URL: {e}")))?;
        }

        if self.oidc.realm.trim().is_empty() || self.oidc.client_id.trim().is_empty() {
            return Err(AppError::Config(
                "oidc.realm and oidc.client_id must not be empty".to_string(),
            ));
        }

        let base_path = &self.portal.base_path;
        if !base_path.is_empty() && (!base_path.starts_with('/') || base_path.ends_with('/')) {
            return Err(AppError::Config(
                "portal.base_path must be empty or start with '/' and not end with '/'"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Overlay the flat deployment variables onto a builder.
///
/// `lookup` resolves a variable name to its value; unset variables leave the
/// key untouched.
pub fn apply_deployment_env<F>(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    for &(variable, key) in DEPLOYMENT_ENV_KEYS {
        builder = builder.set_override_option(key, lookup(variable))?;
    }
    Ok(builder)
}
