//! `run` command implementation.

use anyhow::{Context, Result};
use broker::{MqttSession, MqttSessionConfig};
use contracts::{BROKER_HOST, BROKER_PORT, TELEMETRY_QOS, TELEMETRY_TOPIC};
use store::MongoStore;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::Supervisor;

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        database = %config.store.database,
        collection = %config.store.collection,
        broker = %format!("{BROKER_HOST}:{BROKER_PORT}"),
        topic = TELEMETRY_TOPIC,
        qos = TELEMETRY_QOS.level(),
        "Configuration loaded"
    );

    if let Some(port) = config.runtime.metrics_port {
        observability::init_metrics_only(port)?;
        info!("Metrics endpoint available on port {}", port);
    }

    let session_config = MqttSessionConfig::from_bridge_config(&config);
    info!(client_id = %session_config.client_id, "Client identity generated");

    let mut supervisor = Supervisor::new(MqttSession::new(session_config), config.runtime.clone());
    let connect_store = MongoStore::connect(
        &config.mongodb_uri,
        &config.store,
        config.runtime.connect_timeout(),
    );

    if let Err(e) = supervisor.start(connect_store).await {
        let state = supervisor.state();
        info!(state = ?state, "Startup did not complete, releasing sessions");
        if let Err(cleanup) = supervisor.shutdown().await {
            warn!(error = %cleanup, "Cleanup after failed startup incomplete");
        }
        return Err(CliError::startup(state, e).into());
    }

    info!("Bridge running, press Ctrl+C to stop");

    let summary = supervisor
        .run_until(shutdown_signal())
        .await
        .context("Shutdown failed")?;

    info!(
        records_persisted = summary.events.records_persisted,
        decode_failures = summary.events.decode_failures,
        persist_failures = summary.events.persist_failures,
        abandoned = summary.abandoned,
        duration_secs = summary.duration.as_secs_f64(),
        "Bridge stopped"
    );
    if let Some(store) = supervisor.store() {
        let snap = store.metrics().snapshot();
        info!(
            writes = snap.write_count,
            failures = snap.failure_count,
            mean_write_ms = format!("{:.2}", snap.mean_write_ms),
            "Store statistics"
        );
    }
    summary.print_summary();

    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
