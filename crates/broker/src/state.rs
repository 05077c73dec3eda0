//! Connection state channel

use std::time::Duration;

use contracts::{ConnectionState, ContractError};
use tokio::sync::watch;

/// Wait for `Connected`, bounded by `timeout`
pub(crate) async fn wait_connected(
    rx: &mut watch::Receiver<ConnectionState>,
    timeout: Duration,
) -> Result<(), ContractError> {
    let wait = async {
        loop {
            if rx.borrow_and_update().is_connected() {
                return Ok(());
            }
            if rx.changed().await.is_err() {
                return Err(ContractError::broker_connection(
                    "session dropped before connecting",
                ));
            }
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(ContractError::BrokerTimeout {
            waited_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Publish a state change, recording the connected gauge
pub(crate) fn publish(tx: &watch::Sender<ConnectionState>, state: ConnectionState) {
    observability::metrics::record_broker_connected(state.is_connected());
    tx.send_replace(state);
}
