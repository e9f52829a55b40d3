//! E2E tests for the OpenID Connect login, callback and logout flow

mod common;

use common::provider::VALID_CODE;
use common::{FakeProvider, ProviderBehavior, TestServer, cookie_pair, location, set_cookie};
use reqwest::StatusCode;
use url::Url;

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn test_login_redirects_to_provider() {
    let provider = FakeProvider::start(ProviderBehavior::Healthy).await;
    let server = TestServer::new(&provider.url).await;

    let response = server.get("/login").await;

    assert!(response.status().is_redirection());
    let target = Url::parse(&location(&response)).unwrap();
    assert_eq!(target.host_str(), Some("sso.test.example.com"));
    assert_eq!(target.path(), "/realms/portal/protocol/openid-connect/auth");
    assert_eq!(query_value(&target, "client_id").as_deref(), Some("portal-client"));
    assert_eq!(
        query_value(&target, "redirect_uri").as_deref(),
        Some("http://localhost:8100/callback")
    );
    assert_eq!(query_value(&target, "response_type").as_deref(), Some("code"));
    assert_eq!(
        query_value(&target, "scope").as_deref(),
        Some("openid profile email")
    );
}

#[tokio::test]
async fn test_login_when_signed_in_goes_home() {
    let provider = FakeProvider::start(ProviderBehavior::Healthy).await;
    let server = TestServer::new(&provider.url).await;
    let cookie = server.session_cookie(Some("token"));

    let response = server.get_with_cookie("/login", &cookie).await;

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/portal/home");
}

#[tokio::test]
async fn test_callback_establishes_session() {
    let provider = FakeProvider::start(ProviderBehavior::Healthy).await;
    let server = TestServer::new(&provider.url).await;

    let response = server.get(&format!("/callback?code={VALID_CODE}")).await;

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/portal/home");
    let raw_cookie = set_cookie(&response, "session").expect("session cookie");
    assert!(raw_cookie.contains("HttpOnly"));
    assert!(raw_cookie.contains("SameSite=Lax"));
    assert!(raw_cookie.contains("Max-Age=3600"));

    let cookie = cookie_pair(&response, "session").unwrap();
    let token = cookie.trim_start_matches("session=");
    let session = portal::auth::verify_session_token(token, common::SESSION_SECRET).unwrap();
    let user = session.user.expect("user claims stored");
    assert_eq!(user["preferred_username"], "jdoe");
    assert_eq!(
        session.access_token.as_deref(),
        Some(common::provider::ACCESS_TOKEN)
    );

    let home = server.get_with_cookie("/home", &cookie).await;
    assert_eq!(home.status(), StatusCode::OK);
    let body = home.text().await.unwrap();
    assert!(body.contains("Jane Doe"));
    assert!(body.contains("jdoe@example.com"));
}

#[tokio::test]
async fn test_callback_token_rejection_is_bad_request_with_detail() {
    let provider = FakeProvider::start(ProviderBehavior::Healthy).await;
    let server = TestServer::new(&provider.url).await;

    let response = server.get("/callback?code=wrong-code").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(set_cookie(&response, "session").is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains("Solicitud Incorrecta"));
    assert!(body.contains("Token exchange failed"));
    assert!(body.contains("invalid_grant"));
}

#[tokio::test]
async fn test_callback_missing_access_token_is_bad_request() {
    let provider = FakeProvider::start(ProviderBehavior::MissingAccessToken).await;
    let server = TestServer::new(&provider.url).await;

    let response = server.get(&format!("/callback?code={VALID_CODE}")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.text().await.unwrap();
    assert!(body.contains("No access token received"));
}

#[tokio::test]
async fn test_callback_malformed_token_response_is_bad_gateway() {
    let provider = FakeProvider::start(ProviderBehavior::MalformedToken).await;
    let server = TestServer::new(&provider.url).await;

    let response = server.get(&format!("/callback?code={VALID_CODE}")).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_callback_user_info_rejection_is_bad_request() {
    let provider = FakeProvider::start(ProviderBehavior::RejectUserInfo).await;
    let server = TestServer::new(&provider.url).await;

    let response = server.get(&format!("/callback?code={VALID_CODE}")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.text().await.unwrap();
    assert!(body.contains("Failed to get user info"));
    assert!(body.contains("invalid_token"));
}

#[tokio::test]
async fn test_callback_timeout_is_gateway_timeout() {
    let provider = FakeProvider::start(ProviderBehavior::SlowToken).await;
    let server = TestServer::with_timeout(&provider.url, 1).await;

    let response = server.get(&format!("/callback?code={VALID_CODE}")).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = response.text().await.unwrap();
    assert!(body.contains("Tiempo de Espera de Puerta de Enlace"));
}

#[tokio::test]
async fn test_callback_connection_error_is_bad_gateway() {
    let provider_url = FakeProvider::unreachable().await;
    let server = TestServer::new(&provider_url).await;

    let response = server.get(&format!("/callback?code={VALID_CODE}")).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Error de Puerta de Enlace"));
    assert!(body.contains("Connection error"));
}

#[tokio::test]
async fn test_callback_without_code_is_bad_request() {
    let provider = FakeProvider::start(ProviderBehavior::Healthy).await;
    let server = TestServer::new(&provider.url).await;

    let response = server.get("/callback").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.text().await.unwrap();
    assert!(body.contains("Missing authorization code"));
}

#[tokio::test]
async fn test_callback_with_unparsable_query_renders_error_page() {
    let provider = FakeProvider::start(ProviderBehavior::Healthy).await;
    let server = TestServer::new(&provider.url).await;

    let response = server.get("/callback?code=a&code=b").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.text().await.unwrap();
    assert!(body.contains("Solicitud Incorrecta"));
    assert!(body.contains("duplicate field"));
}

#[tokio::test]
async fn test_callback_with_provider_error_is_bad_request() {
    let provider = FakeProvider::start(ProviderBehavior::Healthy).await;
    let server = TestServer::new(&provider.url).await;

    let response = server
        .get("/callback?error=access_denied&error_description=User%20cancelled")
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.text().await.unwrap();
    assert!(body.contains("access_denied: User cancelled"));
}

#[tokio::test]
async fn test_logout_with_token_redirects_to_provider() {
    let provider = FakeProvider::start(ProviderBehavior::Healthy).await;
    let server = TestServer::new(&provider.url).await;
    let cookie = server.session_cookie(Some("token"));

    let response = server.get_with_cookie("/logout", &cookie).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let target = Url::parse(&location(&response)).unwrap();
    assert_eq!(target.host_str(), Some("sso.test.example.com"));
    assert_eq!(target.path(), "/realms/portal/protocol/openid-connect/logout");
    assert_eq!(
        query_value(&target, "post_logout_redirect_uri").as_deref(),
        Some("http://localhost:8100/")
    );
    assert_eq!(query_value(&target, "client_id").as_deref(), Some("portal-client"));

    let cleared = set_cookie(&response, "session").expect("session removal cookie");
    assert!(cleared.starts_with("session=;"));
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_logout_without_token_redirects_home() {
    let provider = FakeProvider::start(ProviderBehavior::Healthy).await;
    let server = TestServer::new(&provider.url).await;

    let response = server.get("/logout").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/portal/");
    assert!(set_cookie(&response, "session").is_some());
}

#[tokio::test]
async fn test_full_round_trip() {
    let provider = FakeProvider::start(ProviderBehavior::Healthy).await;
    let server = TestServer::new(&provider.url).await;

    let anonymous = server.get("/home").await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let callback = server.get(&format!("/callback?code={VALID_CODE}")).await;
    let cookie = cookie_pair(&callback, "session").expect("session cookie");

    let home = server.get_with_cookie("/home", &cookie).await;
    assert_eq!(home.status(), StatusCode::OK);

    let logout = server.get_with_cookie("/logout", &cookie).await;
    assert_eq!(logout.status(), StatusCode::FOUND);
    let cleared = cookie_pair(&logout, "session").unwrap();

    let after = server.get_with_cookie("/home", &cleared).await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}
