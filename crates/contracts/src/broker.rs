//! BrokerSession / EventHandler traits - publish/subscribe boundary
//!
//! The broker address, topic and quality of service are compiled in;
//! only credentials come from configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConnectionState, ContractError, InboundEvent};

/// Broker host
pub const BROKER_HOST: &str = "139.99.89.162";

/// Broker port
pub const BROKER_PORT: u16 = 1883;

/// Keep-alive interval in seconds
pub const BROKER_KEEP_ALIVE_SECS: u64 = 30;

/// Telemetry topic
pub const TELEMETRY_TOPIC: &str = "bike_data";

/// Telemetry subscription QoS
pub const TELEMETRY_QOS: DeliveryQos = DeliveryQos::AtLeastOnce;

/// Client identity prefix; a nanosecond timestamp is appended per process
pub const CLIENT_ID_PREFIX: &str = "mqtt-ibsms-";

/// Delivery guarantee requested for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryQos {
    /// QoS 0
    AtMostOnce,
    /// QoS 1, duplicates possible
    AtLeastOnce,
    /// QoS 2
    ExactlyOnce,
}

impl DeliveryQos {
    /// Numeric MQTT level
    pub fn level(self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

/// Token held by the session from acceptance until `handle` returns
///
/// Dropping it tells the handler the event is finished.
pub struct Admission(Option<Box<dyn Send>>);

impl Admission {
    /// Nothing to release
    pub fn none() -> Self {
        Self(None)
    }

    /// Release `token` when the event finishes
    pub fn new<T: Send + 'static>(token: T) -> Self {
        Self(Some(Box::new(token)))
    }

    pub fn is_tracked(&self) -> bool {
        self.0.is_some()
    }
}

impl std::fmt::Debug for Admission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Admission").field(&self.is_tracked()).finish()
    }
}

/// Delivery callback
///
/// Invoked once per inbound event, possibly concurrently for distinct events.
/// Failures are handled inside; nothing is reported back to the broker.
#[trait_variant::make(EventHandler: Send)]
pub trait LocalEventHandler {
    /// Accept one event on the delivering task, before `handle` is scheduled
    ///
    /// The session keeps the returned [`Admission`] until `handle` completes.
    fn admit(&self) -> Admission;

    /// Handle one inbound event to completion
    async fn handle(&self, event: InboundEvent);
}

/// Broker session trait
///
/// Owns one client identity. Mock and real sessions share this interface.
#[trait_variant::make(BrokerSession: Send)]
pub trait LocalBrokerSession {
    /// Client identity used on the wire
    fn client_id(&self) -> &str;

    /// Current connection state
    fn connection_state(&self) -> ConnectionState;

    /// Initiate the connection
    ///
    /// Returns once the connection attempt is in flight; use
    /// [`wait_connected`](Self::wait_connected) to await readiness.
    async fn connect(&mut self) -> Result<(), ContractError>;

    /// Wait until the session reports connected
    ///
    /// # Errors
    /// `BrokerTimeout` if not connected within `timeout`
    async fn wait_connected(&mut self, timeout: Duration) -> Result<(), ContractError>;

    /// Subscribe and route every delivery on `topic` to `handler`
    ///
    /// # Errors
    /// `BrokerSubscribe` if the broker rejects or never acknowledges the subscription
    async fn subscribe<H>(
        &mut self,
        topic: &str,
        qos: DeliveryQos,
        handler: Arc<H>,
    ) -> Result<(), ContractError>
    where
        H: EventHandler + Send + Sync + 'static;

    /// Disconnect, letting in-flight acknowledgments settle within `grace`
    ///
    /// Events already received are admitted and handed to the handler before
    /// this returns; none are discarded.
    async fn disconnect(&mut self, grace: Duration) -> Result<(), ContractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_releases_token_on_drop() {
        let token = Arc::new(());
        let admission = Admission::new(token.clone());
        assert!(admission.is_tracked());
        assert_eq!(Arc::strong_count(&token), 2);

        drop(admission);
        assert_eq!(Arc::strong_count(&token), 1);
        assert!(!Admission::none().is_tracked());
    }

    #[test]
    fn test_qos_levels() {
        assert_eq!(DeliveryQos::AtMostOnce.level(), 0);
        assert_eq!(TELEMETRY_QOS.level(), 1);
        assert_eq!(DeliveryQos::ExactlyOnce.level(), 2);
    }
}
