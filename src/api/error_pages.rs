//! Uniform error pages
//!
//! Responses produced from an `AppError` carry an `ErrorPage` marker. This
//! middleware swaps their body for the rendered error template, keeping the
//! status and any other headers (e.g. cookies).

use axum::{
    extract::{Request, State},
    http::{
        StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::auth::Session;
use crate::error::ErrorPage;
use crate::templates::PageContext;

pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .unwrap_or_default();

    let response = next.run(request).await;
    let status = response.status();

    // Axum answers unknown methods itself; give those the same page.
    let detail = match response.extensions().get::<ErrorPage>() {
        Some(page) => page.detail.clone(),
        None if status == StatusCode::METHOD_NOT_ALLOWED => None,
        None => return response,
    };

    let page = PageContext::new(&state.config.portal.base_path, session.user.as_ref());
    let html = match state.templates.render_error(status, detail.as_deref(), page) {
        Ok(html) => html,
        Err(error) => {
            tracing::error!(%error, status = status.as_u16(), "Failed to render error page");
            return response;
        }
    };

    let (parts, _) = response.into_parts();
    let mut rendered = (status, html).into_response();
    for (name, value) in parts.headers.iter() {
        if name != CONTENT_TYPE && name != CONTENT_LENGTH {
            rendered.headers_mut().append(name.clone(), value.clone());
        }
    }
    rendered
}
