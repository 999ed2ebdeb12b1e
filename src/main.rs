use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dough::config::Config;
use dough::db::AccessTokenStorage;
use dough::middleware::SessionCookieResolver;
use dough::plaid::{LinkSettings, PlaidClient, ProviderGateway};
use dough::router::{DoughState, dough_router};
use dough::service::LinkOrchestrator;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        plaid_env = ?cfg.plaid.env,
        redirect_uri = %cfg.plaid.redirect_uri.as_deref().unwrap_or("<none>"),
        loglevel = %cfg.loglevel
    );

    let storage = AccessTokenStorage::connect(&cfg.database_url).await?;
    let plaid = PlaidClient::new(&cfg.plaid)?;
    info!(base_url = %plaid.base_url(), "Plaid client ready");

    let gateway = ProviderGateway::new(Arc::new(plaid), storage, LinkSettings::from(&cfg.plaid));
    let identity = SessionCookieResolver::from_secret(&cfg.session_secret)?;
    let state = DoughState::new(LinkOrchestrator::new(gateway), Arc::new(identity));
    let app = dough_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
}
