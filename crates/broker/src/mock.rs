//! Mock broker
//!
//! In-process `BrokerSession` for tests; supports injected failure scenarios.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    BrokerSession, ConnectionState, ContractError, DeliveryQos, EventHandler, InboundEvent,
};
use tokio::sync::{mpsc, watch};
use tracing::{info, instrument};

use crate::dispatch::{spawn_dispatch, Dispatch};
use crate::identity::generate_client_id;
use crate::state;

/// Mock broker configuration
#[derive(Debug, Default, Clone)]
pub struct MockBrokerConfig {
    /// `connect` returns an error
    pub fail_connect: bool,
    /// `connect` succeeds but the session never reports connected
    pub never_connect: bool,
    /// `subscribe` is refused
    pub fail_subscribe: bool,
}

/// Mock broker session
pub struct MockBroker {
    client_id: String,
    config: MockBrokerConfig,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    state_rx: watch::Receiver<ConnectionState>,
    events_tx: mpsc::UnboundedSender<InboundEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<InboundEvent>>,
    subscription: Option<(String, DeliveryQos)>,
    dispatch: Option<Dispatch>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::with_config(MockBrokerConfig::default())
    }

    pub fn with_config(config: MockBrokerConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            client_id: generate_client_id(),
            config,
            state_tx: Arc::new(state_tx),
            state_rx,
            events_tx,
            events_rx: Some(events_rx),
            subscription: None,
            dispatch: None,
        }
    }

    /// Publisher side of this session
    pub fn handle(&self) -> MockBrokerHandle {
        MockBrokerHandle {
            events_tx: self.events_tx.clone(),
            state_tx: self.state_tx.clone(),
        }
    }

    /// Active subscription, if any
    pub fn subscription(&self) -> Option<(&str, DeliveryQos)> {
        self.subscription
            .as_ref()
            .map(|(topic, qos)| (topic.as_str(), *qos))
    }
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerSession for MockBroker {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn connection_state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    #[instrument(name = "mock_broker_connect", skip(self), fields(client_id = %self.client_id))]
    async fn connect(&mut self) -> Result<(), ContractError> {
        if self.config.fail_connect {
            return Err(ContractError::broker_connection("mock failure"));
        }
        state::publish(&self.state_tx, ConnectionState::Connecting);
        if !self.config.never_connect {
            state::publish(&self.state_tx, ConnectionState::Connected);
        }
        Ok(())
    }

    async fn wait_connected(&mut self, timeout: Duration) -> Result<(), ContractError> {
        let mut rx = self.state_rx.clone();
        state::wait_connected(&mut rx, timeout).await
    }

    #[instrument(name = "mock_broker_subscribe", skip(self, handler), fields(topic = %topic))]
    async fn subscribe<H>(
        &mut self,
        topic: &str,
        qos: DeliveryQos,
        handler: Arc<H>,
    ) -> Result<(), ContractError>
    where
        H: EventHandler + Send + Sync + 'static,
    {
        if !self.connection_state().is_connected() {
            return Err(ContractError::broker_subscribe(topic, "not connected"));
        }
        if self.config.fail_subscribe {
            return Err(ContractError::broker_subscribe(topic, "mock failure"));
        }
        let events_rx = self
            .events_rx
            .take()
            .ok_or_else(|| ContractError::broker_subscribe(topic, "handler already registered"))?;

        self.subscription = Some((topic.to_string(), qos));
        self.dispatch = Some(spawn_dispatch(events_rx, handler));
        info!("mock subscription active");
        Ok(())
    }

    #[instrument(name = "mock_broker_disconnect", skip(self))]
    async fn disconnect(&mut self, _grace: Duration) -> Result<(), ContractError> {
        state::publish(&self.state_tx, ConnectionState::Closed);
        if let Some(dispatch) = self.dispatch.take() {
            let dispatched = dispatch.finish().await;
            info!(dispatched, "mock session closed");
        }
        self.events_rx = None;
        Ok(())
    }
}

/// Injects deliveries and connection events into a [`MockBroker`]
#[derive(Clone)]
pub struct MockBrokerHandle {
    events_tx: mpsc::UnboundedSender<InboundEvent>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
}

impl MockBrokerHandle {
    /// Deliver one event, as the broker would
    ///
    /// Returns `false` once the session is closed.
    pub fn publish(&self, topic: &str, payload: impl Into<Bytes>) -> bool {
        if matches!(*self.state_tx.borrow(), ConnectionState::Closed) {
            return false;
        }
        self.events_tx
            .send(InboundEvent::new(topic, payload))
            .is_ok()
    }

    /// Simulate a transport drop
    pub fn drop_connection(&self, reason: &str) {
        state::publish(
            &self.state_tx,
            ConnectionState::Lost {
                reason: reason.to_string(),
            },
        );
    }

    /// Simulate the transport coming back
    pub fn restore_connection(&self) {
        state::publish(&self.state_tx, ConnectionState::Connected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use contracts::Admission;

    #[derive(Default)]
    struct Counting {
        seen: AtomicUsize,
    }

    impl EventHandler for Counting {
        fn admit(&self) -> Admission {
            Admission::none()
        }

        async fn handle(&self, _event: InboundEvent) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_connect_and_deliver() {
        let mut broker = MockBroker::new();
        let handle = broker.handle();
        let counting = Arc::new(Counting::default());

        broker.connect().await.unwrap();
        broker.wait_connected(Duration::from_secs(1)).await.unwrap();
        broker
            .subscribe("bike_data", DeliveryQos::AtLeastOnce, counting.clone())
            .await
            .unwrap();
        assert_eq!(broker.subscription(), Some(("bike_data", DeliveryQos::AtLeastOnce)));

        assert!(handle.publish("bike_data", "{}"));
        assert!(handle.publish("bike_data", "{}"));
        settle().await;

        assert_eq!(counting.seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fail_connect() {
        let mut broker = MockBroker::with_config(MockBrokerConfig {
            fail_connect: true,
            ..Default::default()
        });
        assert!(matches!(
            broker.connect().await,
            Err(ContractError::BrokerConnection { .. })
        ));
    }

    #[tokio::test]
    async fn test_never_connect_times_out() {
        let mut broker = MockBroker::with_config(MockBrokerConfig {
            never_connect: true,
            ..Default::default()
        });
        broker.connect().await.unwrap();
        assert_eq!(broker.connection_state(), ConnectionState::Connecting);

        let err = broker
            .wait_connected(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::BrokerTimeout { .. }));
    }

    #[tokio::test]
    async fn test_fail_subscribe() {
        let mut broker = MockBroker::with_config(MockBrokerConfig {
            fail_subscribe: true,
            ..Default::default()
        });
        broker.connect().await.unwrap();

        let err = broker
            .subscribe("bike_data", DeliveryQos::AtLeastOnce, Arc::new(Counting::default()))
            .await
            .unwrap_err();
        assert!(err.is_startup_fatal());
    }

    #[tokio::test]
    async fn test_connection_lost_is_not_fatal() {
        let mut broker = MockBroker::new();
        let handle = broker.handle();
        let counting = Arc::new(Counting::default());
        broker.connect().await.unwrap();
        broker
            .subscribe("bike_data", DeliveryQos::AtLeastOnce, counting.clone())
            .await
            .unwrap();

        handle.drop_connection("network unreachable");
        assert!(matches!(broker.connection_state(), ConnectionState::Lost { .. }));

        handle.restore_connection();
        assert!(handle.publish("bike_data", "{}"));
        settle().await;
        assert_eq!(counting.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_delivery_after_disconnect() {
        let mut broker = MockBroker::new();
        let handle = broker.handle();
        let counting = Arc::new(Counting::default());
        broker.connect().await.unwrap();
        broker
            .subscribe("bike_data", DeliveryQos::AtLeastOnce, counting.clone())
            .await
            .unwrap();

        broker.disconnect(Duration::from_millis(10)).await.unwrap();

        assert!(!handle.publish("bike_data", "{}"));
        settle().await;
        assert_eq!(counting.seen.load(Ordering::SeqCst), 0);
        assert_eq!(broker.connection_state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_disconnect_delivers_queued_events() {
        let mut broker = MockBroker::new();
        let handle = broker.handle();
        let counting = Arc::new(Counting::default());
        broker.connect().await.unwrap();
        broker
            .subscribe("bike_data", DeliveryQos::AtLeastOnce, counting.clone())
            .await
            .unwrap();

        for _ in 0..1000 {
            assert!(handle.publish("bike_data", "{}"));
        }
        broker.disconnect(Duration::from_secs(1)).await.unwrap();
        settle().await;

        assert_eq!(counting.seen.load(Ordering::SeqCst), 1000);
    }
}
