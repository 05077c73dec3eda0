//! In-flight event tracking
//!
//! Each delivery holds an [`InFlightGuard`] from admission until it is decoded
//! and written.
//! Shutdown waits on [`InFlight::drain`] for the count to reach zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct Inner {
    count: AtomicUsize,
    idle: Notify,
}

/// Shared counter of events currently being processed
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    inner: Arc<Inner>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one event; dropping the guard releases it
    pub fn enter(&self) -> InFlightGuard {
        let count = self.inner.count.fetch_add(1, Ordering::AcqRel) + 1;
        observability::metrics::record_inflight(count);
        InFlightGuard {
            inner: self.inner.clone(),
        }
    }

    /// Events currently in flight
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Wait until no events are in flight
    ///
    /// # Errors
    /// The number still in flight when `timeout` elapsed.
    pub async fn drain(&self, timeout: Duration) -> Result<(), usize> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let remaining = self.count();
            if remaining == 0 {
                return Ok(());
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let remaining = self.count();
                return if remaining == 0 { Ok(()) } else { Err(remaining) };
            }
        }
    }
}

/// Releases one in-flight slot on drop
#[derive(Debug)]
pub struct InFlightGuard {
    inner: Arc<Inner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let remaining = self.inner.count.fetch_sub(1, Ordering::AcqRel) - 1;
        observability::metrics::record_inflight(remaining);
        if remaining == 0 {
            self.inner.idle.notify_waiters();
        }
    }
}
