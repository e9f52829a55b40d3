//! Portal binary entry point

use portal::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from files and environment
/// 2. Initialize tracing/logging
/// 3. Initialize metrics and AppState
/// 4. Build Axum router
/// 5. Start HTTP server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("portal={},tower_http=debug", config.logging.level).into()
    });

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting portal...");
    tracing::info!(
        public_url = %config.oidc.public_url,
        realm = %config.oidc.realm,
        base_path = %config.portal.base_path,
        "Configuration loaded"
    );
    config.report_insecure_settings();

    // 3. Initialize metrics and application state
    portal::metrics::init_metrics();
    let state = AppState::new(config.clone())?;

    // 4. Build Axum router
    let app = portal::build_router(state);

    // 5. Start HTTP server
    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
