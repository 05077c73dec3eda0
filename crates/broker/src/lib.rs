//! # Broker Session
//!
//! Publish/subscribe sessions implementing `contracts::BrokerSession`.
//!
//! - [`MqttSession`]: MQTT 3.1.1 over rumqttc
//! - [`MockBroker`]: in-process broker with failure injection, for tests

mod dispatch;
mod identity;
mod mock;
mod mqtt;
mod state;

pub use identity::generate_client_id;
pub use mock::{MockBroker, MockBrokerConfig, MockBrokerHandle};
pub use mqtt::{MqttSession, MqttSessionConfig};
