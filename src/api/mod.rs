//! HTTP layer
//!
//! Handlers for:
//! - Portal pages
//! - Error page rendering
//! - Health and metrics

mod error_pages;
pub mod metrics;
mod pages;

pub use error_pages::render_error_pages;
pub use metrics::{metrics_router, record_request};
pub use pages::{health_check, not_found, pages_router};
