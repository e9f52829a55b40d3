//! Page templates
//!
//! Handlebars templates are compiled into the binary and registered once at
//! startup.

use axum::http::StatusCode;
use axum::response::Html;
use handlebars::Handlebars;
use serde::Serialize;

use crate::auth::Claims;
use crate::error::{AppError, error_message};

const PARTIALS: &[(&str, &str)] = &[
    ("layout_header", include_str!("../templates/layout_header.hbs")),
    ("layout_footer", include_str!("../templates/layout_footer.hbs")),
];

const PAGES: &[(&str, &str)] = &[
    ("index", include_str!("../templates/index.hbs")),
    ("home", include_str!("../templates/home.hbs")),
    ("error", include_str!("../templates/error.hbs")),
];

/// Context shared by every page
#[derive(Debug, Serialize)]
pub struct PageContext<'a> {
    pub base_path: &'a str,
    pub authenticated: bool,
    pub user: Option<&'a Claims>,
    /// Claims flattened to display text, in claim order
    pub claims: Vec<ClaimRow<'a>>,
}

/// One claim as shown on the account page
#[derive(Debug, Serialize)]
pub struct ClaimRow<'a> {
    pub name: &'a str,
    pub value: String,
}

impl<'a> PageContext<'a> {
    pub fn new(base_path: &'a str, user: Option<&'a Claims>) -> Self {
        Self {
            base_path,
            authenticated: user.is_some(),
            user,
            claims: user.map(claim_rows).unwrap_or_default(),
        }
    }
}

/// Strings are shown as-is; numbers, booleans, arrays and objects as JSON.
fn claim_rows(user: &Claims) -> Vec<ClaimRow<'_>> {
    user.iter()
        .map(|(name, value)| ClaimRow {
            name,
            value: match value {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            },
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct ErrorContext<'a> {
    #[serde(flatten)]
    page: PageContext<'a>,
    status_code: u16,
    error_title: &'static str,
    error_message: &'static str,
    error_detail: Option<&'a str>,
}

/// Registered template set
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    /// Register partials and pages
    ///
    /// # Errors
    /// Returns `Template` if any template fails to parse
    pub fn new() -> Result<Self, AppError> {
        let mut registry = Handlebars::new();

        for &(name, source) in PARTIALS {
            registry
                .register_partial(name, source)
                .map_err(|e| AppError::Template(e.to_string()))?;
        }
        for &(name, source) in PAGES {
            registry
                .register_template_string(name, source)
                .map_err(|e| AppError::Template(e.to_string()))?;
        }

        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<Html<String>, AppError> {
        self.registry
            .render(name, context)
            .map(Html)
            .map_err(|e| AppError::Template(e.to_string()))
    }

    /// Render the shared error page for a status code
    pub fn render_error(
        &self,
        status: StatusCode,
        detail: Option<&str>,
        page: PageContext<'_>,
    ) -> Result<Html<String>, AppError> {
        let (error_title, error_message) = error_message(status);
        self.render(
            "error",
            &ErrorContext {
                page,
                status_code: status.as_u16(),
                error_title,
                error_message,
                error_detail: detail,
            },
        )
    }
}
