//! Fleet maintenance monitor daemon
//!
//! Loads the model bank, builds the monitoring session for the fixed
//! machine roster, and drives timer-based fleet evaluations. Exposes
//! fleet state and operator controls over HTTP alongside health checks
//! and Prometheus metrics.

mod api;
mod config;

use anyhow::{Context, Result};
use config::MonitorConfig;
use monitor_lib::{
    health::{components, HealthRegistry},
    models::MachineId,
    observability::{MonitorMetrics, StructuredLogger},
    sampler::{SensorSampler, SyntheticSampler},
    scheduler::TickScheduler,
    EvaluationEngine, ModelBank, MonitoringSession,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = MonitorConfig::load().context("Failed to load configuration")?;
    info!(
        instance = %config.instance_name,
        api_port = config.api_port,
        machines = config.machine_count,
        "Fleet monitor starting"
    );

    let metrics = MonitorMetrics::new();
    let logger = StructuredLogger::new(config.instance_name.clone());
    let health_registry = HealthRegistry::new();

    let roster: Vec<MachineId> = (1..=config.machine_count).collect();

    // Any missing or malformed artifact is fatal at startup
    let bank = ModelBank::load(Path::new(&config.artifacts_dir), &roster)
        .with_context(|| format!("Failed to load model bank from {}", config.artifacts_dir))?;
    metrics.set_model_bank_info(bank.seq_length(), bank.bundle().label_encoder.len());
    health_registry.register(components::MODEL_BANK).await;

    let sampler: Box<dyn SensorSampler> = match config.sampler_seed {
        Some(seed) => Box::new(SyntheticSampler::new(seed)),
        None => Box::new(SyntheticSampler::from_entropy()),
    };
    health_registry.register(components::SAMPLER).await;

    let session = MonitoringSession::new(roster, bank.seq_length());
    let engine = EvaluationEngine::new(Arc::new(bank));
    let (scheduler, mut snapshot_rx) =
        TickScheduler::new(engine, session, sampler, config.scheduler_config());
    let scheduler = Arc::new(scheduler);
    health_registry.register(components::SCHEDULER).await;

    logger.log_startup(
        env!("CARGO_PKG_VERSION"),
        &config.artifacts_dir,
        config.machine_count as usize,
    );

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    let scheduler_handle = tokio::spawn(scheduler.clone().run(shutdown_tx.subscribe()));

    // Drain the snapshot channel so the tick loop never backs up on it
    let drain_handle = tokio::spawn(async move {
        while let Some(snapshot) = snapshot_rx.recv().await {
            tracing::debug!(
                machines = snapshot.evaluations.len(),
                flagged = snapshot.flagged_count(),
                all_ready = snapshot.all_ready,
                "Fleet snapshot published"
            );
        }
    });

    let state = Arc::new(api::AppState::new(
        scheduler,
        health_registry.clone(),
        metrics,
    ));
    let api_port = config.api_port;
    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::serve(api_port, state).await {
            error!(error = %e, "API server failed");
        }
    });

    health_registry.set_ready(true).await;
    info!("Fleet monitor ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    logger.log_shutdown("SIGINT received");
    let _ = shutdown_tx.send(());
    let _ = scheduler_handle.await;
    drain_handle.abort();
    api_handle.abort();

    Ok(())
}
