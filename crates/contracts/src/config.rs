//! BridgeConfig - Config Loader output
//!
//! Store URI and broker credentials, plus optional store and runtime tuning.
//! The flat `{ mongodb_uri, username, password }` file is a complete config.

use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Complete bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BridgeConfig {
    /// MongoDB connection string
    #[validate(custom(function = "validate_mongodb_uri"))]
    pub mongodb_uri: String,

    /// Broker username
    pub username: String,

    /// Broker password
    pub password: String,

    /// Target database / collection
    #[serde(default)]
    #[validate(nested)]
    pub store: StoreSettings,

    /// Timeouts and optional metrics endpoint
    #[serde(default)]
    #[validate(nested)]
    pub runtime: RuntimeSettings,
}

/// Store placement
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StoreSettings {
    /// Database name
    #[serde(default = "default_database")]
    #[validate(length(min = 1, message = "database name cannot be empty"))]
    pub database: String,

    /// History collection name
    #[serde(default = "default_collection")]
    #[validate(length(min = 1, message = "collection name cannot be empty"))]
    pub collection: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database: default_database(),
            collection: default_collection(),
        }
    }
}

fn default_database() -> String {
    "IBSMS".to_string()
}

fn default_collection() -> String {
    "bikes_history".to_string()
}

/// Runtime tuning
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RuntimeSettings {
    /// Max wait for the broker to report connected
    #[serde(default = "default_connect_timeout_secs")]
    #[validate(range(min = 1, message = "connect_timeout_secs must be >= 1"))]
    pub connect_timeout_secs: u64,

    /// Max wait for in-flight events during shutdown
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,

    /// Broker disconnect grace period
    #[serde(default = "default_disconnect_grace_ms")]
    pub disconnect_grace_ms: u64,

    /// Pause between transport reconnect attempts
    #[serde(default = "default_reconnect_delay_ms")]
    #[validate(range(min = 1, message = "reconnect_delay_ms must be >= 1"))]
    pub reconnect_delay_ms: u64,

    /// Prometheus port (None = disabled)
    #[serde(default)]
    #[validate(range(min = 1, message = "metrics_port must be >= 1"))]
    pub metrics_port: Option<u16>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            drain_timeout_secs: default_drain_timeout_secs(),
            disconnect_grace_ms: default_disconnect_grace_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            metrics_port: None,
        }
    }
}

impl RuntimeSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_millis(self.disconnect_grace_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_drain_timeout_secs() -> u64 {
    5
}

fn default_disconnect_grace_ms() -> u64 {
    250
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn validate_mongodb_uri(uri: &str) -> Result<(), ValidationError> {
    if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
        Ok(())
    } else {
        Err(ValidationError::new("mongodb_uri_scheme").with_message(Cow::Borrowed(
            "mongodb_uri must start with mongodb:// or mongodb+srv://",
        )))
    }
}

impl BridgeConfig {
    /// Copy with the password masked, for display
    pub fn redacted(&self) -> Self {
        Self {
            password: if self.password.is_empty() {
                String::new()
            } else {
                "********".to_string()
            },
            ..self.clone()
        }
    }
}
