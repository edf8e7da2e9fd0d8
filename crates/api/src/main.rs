//! Union Payments API server

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use unionpay_approval::PaymentStore;
use unionpay_core::{Directory, InMemoryDirectory, TracingAuditSink};
use unionpay_gateway::{GatewayConfig, MobileMoneyGateway};
use unionpay_issuance::IssuanceService;

use unionpay_api::{create_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = PaymentStore::connect(&config.database_url)
        .await
        .with_context(|| format!("opening database {}", config.database_url))?;

    let directory = match &config.directory_file {
        Some(path) => {
            let directory = InMemoryDirectory::from_file(path)
                .with_context(|| format!("loading directory {}", path.display()))?;
            info!(users = directory.user_count(), path = %path.display(), "directory loaded");
            directory
        }
        None => {
            warn!("no DIRECTORY_FILE configured, every request will be unauthenticated");
            InMemoryDirectory::new()
        }
    };
    let directory: Arc<dyn Directory> = Arc::new(directory);

    let gateway_config = GatewayConfig::from_env().context("loading gateway configuration")?;
    let gateway = MobileMoneyGateway::from_config(&gateway_config)
        .context("building payment gateway")?;

    let service = Arc::new(IssuanceService::new(
        store,
        directory.clone(),
        Arc::new(gateway),
        Arc::new(TracingAuditSink),
    ));

    let state = AppState::new(service, directory).with_page_limits(config.page_limits());
    let app = create_router(state);

    let addr = config.bind_address();
    info!("Union payments API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
