use anyhow::Context;
use flagserve::config::AppConfig;
use flagserve::flags::{FlagProvider, UnleashClient};
use flagserve::server::{
    listen_for_signals, router, run_until_shutdown, ExitStatus, HttpServer, ShutdownCoordinator,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,flagserve=debug")),
        )
        .init();

    info!("Starting flagserve");

    let config = AppConfig::from_env().context("invalid configuration")?;
    info!(
        port = config.server.port,
        unleash_url = %config.unleash.url,
        app_name = %config.unleash.app_name,
        refresh_secs = config.unleash.refresh_interval.as_secs(),
        metrics_disabled = config.unleash.disable_metrics,
        "Configuration loaded"
    );

    // Nothing is bound until the flag client is ready
    let client = Arc::new(
        UnleashClient::initialize(config.unleash.clone())
            .await
            .context("unable to initialize feature flags")?,
    );

    let signals = listen_for_signals().context("failed to register signal handlers")?;

    let provider: Arc<dyn FlagProvider> = client.clone();
    let server = HttpServer::new(config.server.clone(), router(provider));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let coordinator = ShutdownCoordinator::new(config.grace_period);

    match run_until_shutdown(server, addr, coordinator, signals).await {
        ExitStatus::Graceful => {
            client.shutdown().await;
            info!("Graceful shutdown complete");
            Ok(())
        }
        status => {
            // Skip remaining cleanup: in-flight work is abandoned with the process
            error!(exit_code = status.code(), "Exiting without graceful shutdown");
            std::process::exit(status.code());
        }
    }
}
