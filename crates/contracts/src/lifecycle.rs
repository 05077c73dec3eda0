//! Lifecycle and connection state
//!
//! Supervisor states move strictly forward, one step at a time.

use serde::{Deserialize, Serialize};

/// Supervisor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Idle,
    StoreConnecting,
    StoreReady,
    BrokerConnecting,
    Subscribed,
    Running,
    Draining,
    Stopped,
}

impl LifecycleState {
    /// All states in transition order
    pub const ORDER: [LifecycleState; 8] = [
        Self::Idle,
        Self::StoreConnecting,
        Self::StoreReady,
        Self::BrokerConnecting,
        Self::Subscribed,
        Self::Running,
        Self::Draining,
        Self::Stopped,
    ];

    fn ordinal(self) -> usize {
        Self::ORDER
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    /// Next state, `None` once stopped
    pub fn successor(self) -> Option<Self> {
        Self::ORDER.get(self.ordinal() + 1).copied()
    }

    /// Whether `next` is the immediate successor
    pub fn can_advance_to(self, next: Self) -> bool {
        self.successor() == Some(next)
    }

    /// Whether startup has completed
    pub fn is_started(self) -> bool {
        self.ordinal() >= Self::Running.ordinal()
    }
}

/// Broker connection state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not yet connected
    #[default]
    Idle,
    /// Connection attempt in flight
    Connecting,
    /// Broker acknowledged the connection
    Connected,
    /// Connection dropped after being established
    Lost { reason: String },
    /// Disconnected on request
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}
