//! MqttSession - MQTT 3.1.1 session over rumqttc
//!
//! `connect` spawns the event loop task. That task owns the rumqttc
//! `EventLoop`: it publishes connection state, forwards publishes to the
//! dispatch channel and SubAcks to the pending subscribe. rumqttc reconnects
//! on the next `poll` after an error; the loop only pauses between attempts.

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    BridgeConfig, BrokerSession, ConnectionState, ContractError, DeliveryQos, EventHandler,
    InboundEvent, BROKER_HOST, BROKER_KEEP_ALIVE_SECS, BROKER_PORT,
};
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubAck,
    SubscribeReasonCode,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::dispatch::{spawn_dispatch, Dispatch};
use crate::identity::generate_client_id;
use crate::state;

/// Capacity of the rumqttc request channel
const REQUEST_CAPACITY: usize = 10;

/// Session parameters
#[derive(Debug, Clone)]
pub struct MqttSessionConfig {
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
    pub client_id: String,
    /// Empty means no credentials are sent
    pub username: String,
    pub password: String,
    /// Pause after a transport error before the next attempt
    pub reconnect_delay: Duration,
    /// Max wait for a SubAck
    pub ack_timeout: Duration,
}

impl MqttSessionConfig {
    /// Compiled-in broker address with credentials and timing from `config`
    pub fn from_bridge_config(config: &BridgeConfig) -> Self {
        Self {
            host: BROKER_HOST.to_string(),
            port: BROKER_PORT,
            keep_alive: Duration::from_secs(BROKER_KEEP_ALIVE_SECS),
            client_id: generate_client_id(),
            username: config.username.clone(),
            password: config.password.clone(),
            reconnect_delay: config.runtime.reconnect_delay(),
            ack_timeout: config.runtime.connect_timeout(),
        }
    }

    fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if !self.username.is_empty() {
            options.set_credentials(&self.username, &self.password);
        }
        options
    }
}

/// Live MQTT session
pub struct MqttSession {
    config: MqttSessionConfig,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    state_rx: watch::Receiver<ConnectionState>,
    client: Option<AsyncClient>,
    event_loop: Option<JoinHandle<()>>,
    events_rx: Option<mpsc::UnboundedReceiver<InboundEvent>>,
    suback_rx: Option<mpsc::UnboundedReceiver<SubAck>>,
    dispatch: Option<Dispatch>,
}

impl MqttSession {
    pub fn new(config: MqttSessionConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        Self {
            config,
            state_tx: Arc::new(state_tx),
            state_rx,
            client: None,
            event_loop: None,
            events_rx: None,
            suback_rx: None,
            dispatch: None,
        }
    }

    async fn await_suback(&mut self, topic: &str) -> Result<(), ContractError> {
        let rx = self
            .suback_rx
            .as_mut()
            .ok_or_else(|| ContractError::broker_subscribe(topic, "session not connected"))?;

        let ack = tokio::time::timeout(self.config.ack_timeout, rx.recv())
            .await
            .map_err(|_| ContractError::broker_subscribe(topic, "no SubAck before timeout"))?
            .ok_or_else(|| ContractError::broker_subscribe(topic, "event loop stopped"))?;

        match ack.return_codes.first() {
            Some(SubscribeReasonCode::Success(granted)) => {
                debug!(topic, granted = ?granted, "subscription granted");
                Ok(())
            }
            Some(SubscribeReasonCode::Failure) => {
                Err(ContractError::broker_subscribe(topic, "broker refused subscription"))
            }
            None => Err(ContractError::broker_subscribe(topic, "empty SubAck")),
        }
    }
}

impl BrokerSession for MqttSession {
    fn client_id(&self) -> &str {
        &self.config.client_id
    }

    fn connection_state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    #[instrument(
        name = "mqtt_connect",
        skip(self),
        fields(host = %self.config.host, port = self.config.port, client_id = %self.config.client_id)
    )]
    async fn connect(&mut self) -> Result<(), ContractError> {
        if self.client.is_some() {
            return Err(ContractError::broker_connection("session already connected"));
        }

        let (client, event_loop) = AsyncClient::new(self.config.mqtt_options(), REQUEST_CAPACITY);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (suback_tx, suback_rx) = mpsc::unbounded_channel();

        state::publish(&self.state_tx, ConnectionState::Connecting);
        let handle = tokio::spawn(drive(
            event_loop,
            self.state_tx.clone(),
            events_tx,
            suback_tx,
            self.config.reconnect_delay,
        ));

        info!("broker connection initiated");
        self.client = Some(client);
        self.event_loop = Some(handle);
        self.events_rx = Some(events_rx);
        self.suback_rx = Some(suback_rx);
        Ok(())
    }

    async fn wait_connected(&mut self, timeout: Duration) -> Result<(), ContractError> {
        let mut rx = self.state_rx.clone();
        let result = state::wait_connected(&mut rx, timeout).await;
        if let Err(e) = &result {
            error!(state = ?self.connection_state(), error = %e, "broker not connected");
        }
        result
    }

    #[instrument(name = "mqtt_subscribe", skip(self, handler), fields(topic = %topic, qos = qos.level()))]
    async fn subscribe<H>(
        &mut self,
        topic: &str,
        qos: DeliveryQos,
        handler: Arc<H>,
    ) -> Result<(), ContractError>
    where
        H: EventHandler + Send + Sync + 'static,
    {
        let client = self
            .client
            .clone()
            .ok_or_else(|| ContractError::broker_subscribe(topic, "session not connected"))?;

        if self.events_rx.is_none() {
            return Err(ContractError::broker_subscribe(topic, "handler already registered"));
        }

        client
            .subscribe(topic, to_qos(qos))
            .await
            .map_err(|e| ContractError::broker_subscribe(topic, e.to_string()))?;

        if let Err(e) = self.await_suback(topic).await {
            error!(error = %e, "subscription failed");
            return Err(e);
        }

        if let Some(events_rx) = self.events_rx.take() {
            self.dispatch = Some(spawn_dispatch(events_rx, handler));
        }
        info!("subscribed");
        Ok(())
    }

    #[instrument(name = "mqtt_disconnect", skip(self), fields(client_id = %self.config.client_id))]
    async fn disconnect(&mut self, grace: Duration) -> Result<(), ContractError> {
        let mut outcome = Ok(());

        if let Some(client) = self.client.take() {
            match tokio::time::timeout(grace, client.disconnect()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    outcome = Err(ContractError::BrokerDisconnect {
                        message: e.to_string(),
                    })
                }
                Err(_) => {
                    outcome = Err(ContractError::BrokerDisconnect {
                        message: "disconnect request not accepted within grace period".into(),
                    })
                }
            }
        }

        if let Some(mut handle) = self.event_loop.take() {
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                debug!("event loop still running after grace period, aborting");
                handle.abort();
            }
        }

        // The event loop has stopped receiving; hand over what it already queued.
        if let Some(dispatch) = self.dispatch.take() {
            let dispatched = dispatch.finish().await;
            debug!(dispatched, "events dispatched this session");
        }
        self.events_rx = None;
        self.suback_rx = None;
        state::publish(&self.state_tx, ConnectionState::Closed);

        match &outcome {
            Ok(()) => info!("broker disconnected"),
            Err(e) => warn!(error = %e, "broker disconnect incomplete"),
        }
        outcome
    }
}

fn to_qos(qos: DeliveryQos) -> QoS {
    match qos {
        DeliveryQos::AtMostOnce => QoS::AtMostOnce,
        DeliveryQos::AtLeastOnce => QoS::AtLeastOnce,
        DeliveryQos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// Event loop task
async fn drive(
    mut event_loop: EventLoop,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    events_tx: mpsc::UnboundedSender<InboundEvent>,
    suback_tx: mpsc::UnboundedSender<SubAck>,
    reconnect_delay: Duration,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!(session_present = ack.session_present, "broker connected");
                state::publish(&state_tx, ConnectionState::Connected);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(topic = %publish.topic, payload_len = publish.payload.len(), "message received");
                trace!(payload = %String::from_utf8_lossy(&publish.payload), "message payload");
                // Buffered until a handler is registered; fails only after disconnect.
                let _ = events_tx.send(InboundEvent::new(publish.topic, publish.payload));
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                let _ = suback_tx.send(ack);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("disconnect sent, event loop stopping");
                state::publish(&state_tx, ConnectionState::Closed);
                break;
            }
            Ok(event) => {
                trace!(event = ?event, "mqtt event");
            }
            Err(e) => {
                if matches!(*state_tx.borrow(), ConnectionState::Closed) {
                    break;
                }
                match &e {
                    ConnectionError::ConnectionRefused(code) => {
                        warn!(code = ?code, "broker refused connection")
                    }
                    _ => warn!(error = %e, "broker connection lost"),
                }
                state::publish(&state_tx, lost_state(&e));
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}

/// State published after a transport error
///
/// A refused ConnAck surfaces here, not as an incoming packet.
fn lost_state(e: &ConnectionError) -> ConnectionState {
    let reason = match e {
        ConnectionError::ConnectionRefused(code) => format!("connection refused: {code:?}"),
        other => other.to_string(),
    };
    ConnectionState::Lost { reason }
}
