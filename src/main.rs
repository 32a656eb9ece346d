use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use raffle_server::api;
use raffle_server::api::rate_limit::{
    create_client_rate_limiter, spawn_pruner, RATE_LIMIT_PRUNE_INTERVAL,
};
use raffle_server::config::Config;
use raffle_server::rooms::{Janitor, RoomRegistry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "raffle_server=info,warp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let registry = Arc::new(RoomRegistry::from_config(&config.rooms));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let janitor = Janitor::from_config(registry.clone(), &config.rooms).spawn(shutdown_rx);

    let limiter = if config.rate_limit.enabled {
        create_client_rate_limiter(config.rate_limit.per_second)
    } else {
        tracing::warn!("Rate limiting disabled");
        None
    };

    let pruner = limiter
        .clone()
        .map(|limiter| spawn_pruner(limiter, RATE_LIMIT_PRUNE_INTERVAL, shutdown_tx.subscribe()));

    let routes = api::routes(registry, config.server.template_dir.clone(), limiter);

    let (addr, server) = warp::serve(routes).try_bind_with_graceful_shutdown(
        config.bind_address(),
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal, running until killed");
                std::future::pending::<()>().await;
            }
        },
    )?;

    tracing::info!(address = %addr, "Raffle server listening");
    server.await;

    tracing::info!("Shutting down");
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Room janitor already stopped");
    }
    janitor.await?;
    if let Some(pruner) = pruner {
        pruner.await?;
    }

    Ok(())
}
