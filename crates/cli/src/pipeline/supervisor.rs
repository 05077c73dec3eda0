//! Lifecycle supervisor - owns both sessions and drives startup / shutdown.
//!
//! Startup order: store session → verify → broker session → subscribe.
//! Shutdown order: broker disconnect → in-flight drain → store close.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use contracts::{
    BrokerSession, ContractError, LifecycleState, RuntimeSettings, TelemetryStore, TELEMETRY_QOS,
    TELEMETRY_TOPIC,
};
use ingestion::IngestionPipeline;
use tracing::{error, info, instrument, warn};

use super::RunSummary;

/// Drives the linear lifecycle `Idle → … → Stopped`
pub struct Supervisor<S, B> {
    state: LifecycleState,
    settings: RuntimeSettings,
    broker: B,
    broker_started: bool,
    store: Option<Arc<S>>,
    pipeline: Option<Arc<IngestionPipeline<S>>>,
    running_since: Option<Instant>,
    summary: Option<RunSummary>,
}

impl<S, B> Supervisor<S, B>
where
    S: TelemetryStore + Send + Sync + 'static,
    B: BrokerSession,
{
    pub fn new(broker: B, settings: RuntimeSettings) -> Self {
        Self {
            state: LifecycleState::Idle,
            settings,
            broker,
            broker_started: false,
            store: None,
            pipeline: None,
            running_since: None,
            summary: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Store session, once connected
    pub fn store(&self) -> Option<Arc<S>> {
        self.store.clone()
    }

    fn advance(&mut self, next: LifecycleState) -> Result<(), ContractError> {
        if !self.state.can_advance_to(next) {
            return Err(ContractError::Lifecycle {
                from: self.state,
                to: next,
            });
        }
        info!(from = ?self.state, to = ?next, "lifecycle transition");
        self.state = next;
        Ok(())
    }

    /// Bring both sessions up and start consuming
    ///
    /// Every error is startup-fatal and already logged by the session that
    /// raised it. The state is left where the failure happened; call [`shutdown`](Self::shutdown) to release what was opened.
    #[instrument(name = "supervisor_start", skip(self, connect_store))]
    pub async fn start<F>(&mut self, connect_store: F) -> Result<(), ContractError>
    where
        F: Future<Output = Result<S, ContractError>>,
    {
        self.advance(LifecycleState::StoreConnecting)?;
        let store = Arc::new(connect_store.await?);
        self.store = Some(store.clone());
        store.verify().await?;
        info!(store = %store.name(), "store connected");
        self.advance(LifecycleState::StoreReady)?;

        self.advance(LifecycleState::BrokerConnecting)?;
        self.broker_started = true;
        info!(client_id = %self.broker.client_id(), "connecting to broker");
        self.broker.connect().await?;
        self.broker
            .wait_connected(self.settings.connect_timeout())
            .await?;

        let pipeline = Arc::new(IngestionPipeline::new(store));
        self.pipeline = Some(pipeline.clone());
        self.broker
            .subscribe(TELEMETRY_TOPIC, TELEMETRY_QOS, pipeline)
            .await?;
        self.advance(LifecycleState::Subscribed)?;

        self.advance(LifecycleState::Running)?;
        self.running_since = Some(Instant::now());
        Ok(())
    }

    /// Stay in `Running` until `signal` resolves, then shut down
    pub async fn run_until<F>(&mut self, signal: F) -> Result<RunSummary, ContractError>
    where
        F: Future<Output = ()>,
    {
        signal.await;
        info!("shutdown requested");
        self.shutdown().await
    }

    /// Drain and release both sessions
    ///
    /// From `Running` this walks `Draining → Stopped`. After a failed start it
    /// releases whatever was opened without a transition. Calling it again
    /// returns the same summary.
    #[instrument(name = "supervisor_shutdown", skip(self), fields(state = ?self.state))]
    pub async fn shutdown(&mut self) -> Result<RunSummary, ContractError> {
        if let Some(summary) = &self.summary {
            return Ok(summary.clone());
        }

        let running = self.state == LifecycleState::Running;
        if running {
            self.advance(LifecycleState::Draining)?;
        }

        let summary = self.teardown().await;

        if running {
            self.advance(LifecycleState::Stopped)?;
        }
        self.summary = Some(summary.clone());
        Ok(summary)
    }

    async fn teardown(&mut self) -> RunSummary {
        let mut summary = RunSummary {
            duration: self
                .running_since
                .map(|since| since.elapsed())
                .unwrap_or_default(),
            ..Default::default()
        };

        if self.broker_started {
            // Failures here are logged by the session; shutdown continues.
            let _ = self
                .broker
                .disconnect(self.settings.disconnect_grace())
                .await;
        }

        if let Some(pipeline) = &self.pipeline {
            let drain_timeout = self.settings.drain_timeout();
            match pipeline.inflight().drain(drain_timeout).await {
                Ok(()) => info!("in-flight events drained"),
                Err(remaining) => {
                    warn!(
                        remaining,
                        timeout_secs = drain_timeout.as_secs(),
                        "drain timed out, closing store with events in flight"
                    );
                    summary.abandoned = remaining;
                }
            }
            summary.events = pipeline.metrics().snapshot();
        }

        if let Some(store) = &self.store {
            match store.close().await {
                Ok(()) => info!(store = %store.name(), "store disconnected"),
                Err(e) => error!(store = %store.name(), error = %e, "store disconnect failed"),
            }
        }

        summary
    }
}
