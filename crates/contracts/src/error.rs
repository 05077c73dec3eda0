//! Layered error definitions
//!
//! Categorized by source: config / store / broker / lifecycle

use thiserror::Error;

use crate::LifecycleState;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Store Errors =====
    /// Store session could not be established
    #[error("store connection error: {message}")]
    StoreConnection { message: String },

    /// Store liveness check failed
    #[error("store ping error: {message}")]
    StorePing { message: String },

    /// Store insert failed
    #[error("store write error on '{collection}': {message}")]
    StoreWrite { collection: String, message: String },

    /// Store session already closed
    #[error("store session '{name}' is closed")]
    StoreClosed { name: String },

    // ===== Broker Errors =====
    /// Broker connection error
    #[error("broker connection error: {message}")]
    BrokerConnection { message: String },

    /// Broker did not report connected in time
    #[error("broker connect timeout: waited {waited_ms}ms")]
    BrokerTimeout { waited_ms: u64 },

    /// Subscription rejected or not acknowledged
    #[error("broker subscribe error for topic '{topic}': {message}")]
    BrokerSubscribe { topic: String, message: String },

    /// Broker disconnect error
    #[error("broker disconnect error: {message}")]
    BrokerDisconnect { message: String },

    // ===== Lifecycle Errors =====
    /// Illegal lifecycle transition
    #[error("illegal lifecycle transition: {from:?} -> {to:?}")]
    Lifecycle {
        from: LifecycleState,
        to: LifecycleState,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create store connection error
    pub fn store_connection(message: impl Into<String>) -> Self {
        Self::StoreConnection {
            message: message.into(),
        }
    }

    /// Create store write error
    pub fn store_write(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreWrite {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Create broker connection error
    pub fn broker_connection(message: impl Into<String>) -> Self {
        Self::BrokerConnection {
            message: message.into(),
        }
    }

    /// Create broker subscribe error
    pub fn broker_subscribe(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BrokerSubscribe {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Whether this error must abort startup
    pub fn is_startup_fatal(&self) -> bool {
        !matches!(
            self,
            Self::StoreWrite { .. } | Self::StoreClosed { .. } | Self::BrokerDisconnect { .. }
        )
    }
}
