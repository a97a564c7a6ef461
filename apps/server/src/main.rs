use dealgate_core::catalog::CATALOG;
use dealgate_server::config::Config;
use dealgate_server::dispatcher::start_dispatcher;
use dealgate_server::{build_state, init_tracing};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing(config.log_format);
    let (state, jobs) = build_state(&config).await?;
    tracing::info!("Catalog loaded with {} items", CATALOG.len());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = start_dispatcher(
        state.deliverable_service.clone(),
        jobs,
        config.dispatch_interval,
        config.dispatch_batch,
        config.generation_timeout,
        shutdown_rx,
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    shutdown_tx.send(true)?;
    dispatcher.await?;
    Ok(())
}
