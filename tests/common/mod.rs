//! Common test utilities for E2E tests

pub mod provider;

use portal::auth::{Claims, Session, create_session_token};
use portal::{AppState, config};
use reqwest::Response;
use reqwest::header::SET_COOKIE;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub use provider::{FakeProvider, ProviderBehavior};

pub const SESSION_SECRET: &str = "test-secret-key-32-bytes-long!!!";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _static_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Start a portal talking to the given provider base URL
    pub async fn new(provider_url: &str) -> Self {
        Self::with_timeout(provider_url, 5).await
    }

    pub async fn with_timeout(provider_url: &str, timeout_seconds: u64) -> Self {
        let static_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(static_dir.path().join("css")).unwrap();
        std::fs::write(
            static_dir.path().join("css/portal.css"),
            "body { margin: 0; }",
        )
        .unwrap();

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            oidc: config::OidcConfig {
                public_url: "http://sso.test.example.com".to_string(),
                internal_url: provider_url.to_string(),
                realm: "portal".to_string(),
                client_id: "portal-client".to_string(),
                client_secret: "portal-secret".to_string(),
                redirect_uri: "http://localhost:8100/callback".to_string(),
                scope: "openid profile email".to_string(),
                timeout_seconds,
            },
            portal: config::PortalConfig {
                base_path: "/portal".to_string(),
                static_dir: static_dir.path().to_path_buf(),
            },
            auth: config::AuthConfig {
                session_secret: SESSION_SECRET.to_string(),
                session_max_age: 3600,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        portal::metrics::init_metrics();
        let state = AppState::new(config).unwrap();

        // Redirects are asserted on, never followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = portal::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: format!("http://{}", addr),
            state,
            _static_dir: static_dir,
            client,
        }
    }

    /// Get URL for a portal path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Signed session cookie for a signed-in user, as a `Cookie` header value
    pub fn session_cookie(&self, access_token: Option<&str>) -> String {
        let mut claims = Claims::new();
        claims.insert("sub".to_string(), "user-1".into());
        claims.insert("preferred_username".to_string(), "jdoe".into());
        claims.insert("name".to_string(), "Jane Doe".into());

        let session = Session {
            user: Some(claims),
            access_token: access_token.map(ToString::to_string),
        };
        let token = create_session_token(&session, SESSION_SECRET, 3600)
            .expect("Failed to create test session");
        format!("session={token}")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn get_with_cookie(&self, path: &str, cookie: &str) -> Response {
        self.client
            .get(self.url(path))
            .header("Cookie", cookie)
            .send()
            .await
            .unwrap()
    }
}

/// Value of the `Location` header
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// The raw `Set-Cookie` header for a cookie name, if present
pub fn set_cookie(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(ToString::to_string)
}

/// `name=value` pair of a cookie set by the response, ready for a `Cookie` header
pub fn cookie_pair(response: &Response, name: &str) -> Option<String> {
    set_cookie(response, name)
        .and_then(|raw| raw.split(';').next().map(ToString::to_string))
}
