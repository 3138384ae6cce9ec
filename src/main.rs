use anyhow::Result;
use content_portal::{auth::OktaProvider, config::Config, web, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting content portal");

    // Load configuration from environment
    let config = Arc::new(Config::load()?);
    tracing::info!(
        environment = ?config.environment,
        issuer = %config.issuer,
        token_storage = ?config.token_storage,
        "Configuration loaded"
    );

    let provider = Arc::new(OktaProvider::new(Arc::clone(&config))?);

    if config.is_configured() {
        // Prefetch JWKS so /readyz passes immediately; a failure is retried on first use
        match provider.validator().prefetch_jwks().await {
            Ok(()) => tracing::info!("JWKS prefetched successfully - readiness check will pass"),
            Err(e) => tracing::warn!(error = %e, "Failed to prefetch JWKS at startup"),
        }
    } else {
        tracing::warn!(
            origin = %config.origin(),
            "OKTA_ISSUER / OKTA_CLIENT_ID not set; the portal will show setup instructions"
        );
    }

    // Create shared application state
    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        provider,
    });

    let app = web::create_router(state);

    // Bind and serve
    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Portal listening on {}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
