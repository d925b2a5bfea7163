//! Easypanel Gateway - REST relay for the Easypanel tRPC API

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easypanel_gateway::{config::Args, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_tracing(&args);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let state = Arc::new(server::AppState::new(args)?);
    let args = &state.args;

    info!("======================================");
    info!("  Easypanel API Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("App URL: {}", args.public_url());
    info!("Easypanel URL: {}", args.easypanel_url);
    info!(
        "Easypanel credentials: {}",
        if args.session_config().credentials.is_some() { "set" } else { "NOT SET" }
    );
    info!(
        "API secret: {}",
        if state.guard.is_configured() { "set" } else { "not set (dev mode)" }
    );
    info!("Token TTL: {}s", args.token_ttl_secs);
    info!("Request timeout: {}ms", args.request_timeout_ms);
    info!("======================================");

    // Pre-authenticate; failure is not fatal, the first call logs in lazily
    if let Err(e) = state.session.get().await {
        warn!("Could not authenticate with Easypanel at startup: {}", e);
        warn!("The gateway will retry on the first API call");
    }

    server::run(state).await?;

    Ok(())
}

fn init_tracing(args: &Args) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("easypanel_gateway={},info", args.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);

    if args.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
