//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Startup did not reach the running state
    #[error("Startup failed in state {state}: {source}")]
    Startup {
        state: String,
        #[source]
        source: contracts::ContractError,
    },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn startup(state: contracts::LifecycleState, source: contracts::ContractError) -> Self {
        Self::Startup {
            state: format!("{state:?}"),
            source,
        }
    }

    /// Startup failures are logged by the session that raised them
    pub fn is_logged_at_source(&self) -> bool {
        matches!(self, Self::Startup { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ContractError, LifecycleState};

    #[test]
    fn test_startup_error_not_logged_twice() {
        let err = CliError::startup(
            LifecycleState::StoreConnecting,
            ContractError::store_connection("refused"),
        );
        assert!(err.is_logged_at_source());
        assert_eq!(
            err.to_string(),
            "Startup failed in state StoreConnecting: store connection error: refused"
        );

        let err: anyhow::Error = err.into();
        assert!(err
            .downcast_ref::<CliError>()
            .is_some_and(CliError::is_logged_at_source));
    }

    #[test]
    fn test_missing_config_still_reported() {
        assert!(!CliError::config_not_found("config.json").is_logged_at_source());
    }
}
