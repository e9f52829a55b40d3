//! OpenID Connect handshake client
//!
//! Implements the provider side of the authorization code flow against a
//! realm-scoped provider (`{base}/realms/{realm}/protocol/openid-connect/*`).

use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::session::Claims;
use crate::config::OidcConfig;
use crate::error::AppError;

/// Endpoints and client registration for the configured provider
#[derive(Debug, Clone)]
pub struct Provider {
    config: OidcConfig,
    authorization_endpoint: Url,
    token_endpoint: Url,
    userinfo_endpoint: Url,
    end_session_endpoint: Url,
}

fn realm_endpoint(base: &str, realm: &str, leaf: &str) -> Result<Url, AppError> {
    let raw = format!(
        "{}/realms/{}/protocol/openid-connect/{}",
        base.trim_end_matches('/'),
        realm,
        leaf
    );
    Url::parse(&raw).map_err(|e| AppError::Config(format!("invalid provider endpoint {raw}: {e}")))
}

impl Provider {
    /// Derive endpoints from configuration
    ///
    /// Browser-facing endpoints use the public URL; back-channel endpoints
    /// use the internal URL.
    pub fn new(config: &OidcConfig) -> Result<Self, AppError> {
        Ok(Self {
            authorization_endpoint: realm_endpoint(&config.public_url, &config.realm, "auth")?,
            token_endpoint: realm_endpoint(&config.internal_url, &config.realm, "token")?,
            userinfo_endpoint: realm_endpoint(&config.internal_url, &config.realm, "userinfo")?,
            end_session_endpoint: realm_endpoint(&config.public_url, &config.realm, "logout")?,
            config: config.clone(),
        })
    }

    /// URL the browser is sent to in order to sign in
    pub fn authorization_url(&self) -> Url {
        let mut url = self.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scope);
        url
    }

    /// Where the provider sends the browser after logging out: the redirect
    /// URI with its trailing `/callback` segment replaced by `/`.
    pub fn post_logout_redirect_uri(&self) -> String {
        let redirect_uri = &self.config.redirect_uri;
        let base = redirect_uri
            .rsplit_once("/callback")
            .map_or(redirect_uri.as_str(), |(base, _)| base);
        format!("{base}/")
    }

    /// URL the browser is sent to in order to end the provider session
    pub fn logout_url(&self) -> Url {
        let mut url = self.end_session_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("post_logout_redirect_uri", &self.post_logout_redirect_uri())
            .append_pair("client_id", &self.config.client_id);
        url
    }

    /// Open a short-lived client for one callback's back-channel calls
    pub fn handshake(&self) -> Result<Handshake<'_>, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("portal/", env!("CARGO_PKG_VERSION")))
            .timeout(self.config.timeout())
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Handshake {
            provider: self,
            http,
        })
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
}

/// Result of a completed handshake
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: Claims,
    pub access_token: String,
}

/// Back-channel client bound to one callback
pub struct Handshake<'a> {
    provider: &'a Provider,
    http: reqwest::Client,
}

impl Handshake<'_> {
    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    /// - `TokenExchange` with the upstream body on a non-200 answer
    /// - `UpstreamTimeout` / `UpstreamConnection` on transport failures
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let config = &self.provider.config;
        let response = self
            .http
            .post(self.provider.token_endpoint.clone())
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", config.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "Token endpoint rejected the code");
            return Err(AppError::TokenExchange(body));
        }

        serde_json::from_str(&body).map_err(|e| AppError::UpstreamResponse(e.to_string()))
    }

    /// Fetch the user's claims with a bearer token
    ///
    /// # Errors
    /// - `UserInfo` with the upstream body on a non-200 answer
    /// - `UpstreamTimeout` / `UpstreamConnection` on transport failures
    pub async fn fetch_user_info(&self, access_token: &str) -> Result<Claims, AppError> {
        let response = self
            .http
            .get(self.provider.userinfo_endpoint.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "User-info endpoint rejected the token");
            return Err(AppError::UserInfo(body));
        }

        serde_json::from_str(&body).map_err(|e| AppError::UpstreamResponse(e.to_string()))
    }

    /// Run the whole exchange: code → tokens → user-info
    pub async fn complete(&self, code: &str) -> Result<Authenticated, AppError> {
        let tokens = self.exchange_code(code).await?;
        let access_token = tokens
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or(AppError::MissingAccessToken)?;

        tracing::debug!(
            token_type = tokens.token_type.as_deref().unwrap_or("unknown"),
            expires_in = tokens.expires_in,
            "Received access token"
        );

        let user = self.fetch_user_info(&access_token).await?;
        Ok(Authenticated { user, access_token })
    }
}
