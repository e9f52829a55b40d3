//! Fake identity provider serving the token and user-info endpoints

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;

pub const VALID_CODE: &str = "valid-code";
pub const ACCESS_TOKEN: &str = "test-access-token";

/// How the fake provider answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderBehavior {
    /// Accepts `VALID_CODE` and `ACCESS_TOKEN`
    Healthy,
    /// Token endpoint takes longer than any test timeout
    SlowToken,
    /// Token endpoint answers 200 without an access token
    MissingAccessToken,
    /// Token endpoint answers 200 with a body that is not JSON
    MalformedToken,
    /// User-info endpoint rejects every token
    RejectUserInfo,
}

pub struct FakeProvider {
    pub url: String,
}

impl FakeProvider {
    pub async fn start(behavior: ProviderBehavior) -> Self {
        let app = Router::new()
            .route("/realms/portal/protocol/openid-connect/token", post(token))
            .route(
                "/realms/portal/protocol/openid-connect/userinfo",
                get(userinfo),
            )
            .with_state(behavior);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
        }
    }

    /// Base URL of a port nobody listens on
    pub async fn unreachable() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }
}

fn invalid_grant() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "invalid_grant",
            "error_description": "Code not valid"
        })),
    )
        .into_response()
}

fn field<'a>(form: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    form.get(name).map(String::as_str)
}

async fn token(
    State(behavior): State<ProviderBehavior>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    if behavior == ProviderBehavior::SlowToken {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    let valid = field(&form, "grant_type") == Some("authorization_code")
        && field(&form, "code") == Some(VALID_CODE)
        && field(&form, "client_id") == Some("portal-client")
        && field(&form, "client_secret") == Some("portal-secret")
        && field(&form, "redirect_uri") == Some("http://localhost:8100/callback");
    if !valid {
        return invalid_grant();
    }

    match behavior {
        ProviderBehavior::MissingAccessToken => {
            Json(json!({ "token_type": "Bearer", "expires_in": 300 })).into_response()
        }
        ProviderBehavior::MalformedToken => (StatusCode::OK, "<html>oops</html>").into_response(),
        _ => Json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 300
        }))
        .into_response(),
    }
}

async fn userinfo(State(behavior): State<ProviderBehavior>, headers: HeaderMap) -> Response {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if behavior == ProviderBehavior::RejectUserInfo || bearer != Some(ACCESS_TOKEN) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_token" })),
        )
            .into_response();
    }

    Json(json!({
        "sub": "user-1",
        "preferred_username": "jdoe",
        "name": "Jane Doe",
        "email": "jdoe@example.com"
    }))
    .into_response()
}
