use anyhow::{Context, Result};
use axpert_gateway::config::Config;
use axpert_gateway::inverter;
use axpert_gateway::logging::{get_logger, init_logging};
use axpert_gateway::metrics::GatewayMetrics;
use axpert_gateway::poller::Poller;
use axpert_gateway::web::{self, APP_VERSION, AppState};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let logger = get_logger("main");
    logger.info(&format!("axpert-gateway {} starting up", APP_VERSION));

    let metrics = GatewayMetrics::new().context("Failed to create metrics registry")?;

    let inverters = inverter::discover(&config.devices).await;
    if inverters.is_empty() {
        logger.error("No inverters found, exiting");
        anyhow::bail!(
            "no inverters found on {}",
            config.devices.paths.join(", ")
        );
    }
    logger.info(&format!(
        "Attached {} inverter(s): {}",
        inverters.len(),
        inverters.serial_numbers().join(", ")
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller_task = if config.poller.enabled {
        let poller = Poller::new(inverters.clone(), metrics.clone(), config.poller.interval());
        Some(tokio::spawn(poller.run(shutdown_rx.clone())))
    } else {
        logger.info("Metrics collection disabled");
        None
    };

    let state = AppState {
        inverters,
        metrics,
        control_enabled: config.control.enabled,
        metrics_path: config.web.metrics_path.clone(),
    };
    let addr = config.web.socket_addr()?;

    let shutdown_logger = logger.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            shutdown_logger.error(&format!("Failed to listen for shutdown signal: {}", e));
            std::future::pending::<()>().await;
        }
        shutdown_logger.info("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    };

    let result = web::serve(state, addr, shutdown).await;

    if let Some(task) = poller_task {
        if result.is_err() {
            // The shutdown signal never fired; stop polling ourselves
            task.abort();
        } else if let Err(e) = task.await {
            logger.error(&format!("Poller task failed: {}", e));
        }
    }

    match result {
        Ok(()) => {
            logger.info("Shutdown complete");
            Ok(())
        }
        Err(e) => {
            logger.error(&format!("Web server error: {}", e));
            Err(e)
        }
    }
}
