//! Delivery fan-out

use std::sync::Arc;

use contracts::{EventHandler, InboundEvent};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Running fan-out loop for one subscription
pub(crate) struct Dispatch {
    task: JoinHandle<usize>,
    stop: Option<oneshot::Sender<()>>,
}

/// Hand every received event to `handler` on its own task
///
/// Deliveries run concurrently; nothing orders them relative to each other.
/// Each event is admitted before its task is spawned.
pub(crate) fn spawn_dispatch<H>(
    mut rx: mpsc::UnboundedReceiver<InboundEvent>,
    handler: Arc<H>,
) -> Dispatch
where
    H: EventHandler + Send + Sync + 'static,
{
    let (stop_tx, mut stop_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        let mut dispatched = 0usize;
        loop {
            tokio::select! {
                biased;
                next = rx.recv() => match next {
                    Some(event) => {
                        deliver(&handler, event);
                        dispatched += 1;
                    }
                    None => break,
                },
                _ = &mut stop_rx => {
                    // Refuse new events, then hand over everything already queued.
                    rx.close();
                    while let Some(event) = rx.recv().await {
                        deliver(&handler, event);
                        dispatched += 1;
                    }
                    break;
                }
            }
        }
        trace!(dispatched, "dispatch loop ended");
        dispatched
    });

    Dispatch {
        task,
        stop: Some(stop_tx),
    }
}

fn deliver<H>(handler: &Arc<H>, event: InboundEvent)
where
    H: EventHandler + Send + Sync + 'static,
{
    trace!(topic = %event.topic, "dispatching event");
    let admission = handler.admit();
    let handler = handler.clone();
    tokio::spawn(async move {
        handler.handle(event).await;
        drop(admission);
    });
}

impl Dispatch {
    /// Stop accepting events and wait until every queued one is admitted
    ///
    /// The queue is closed first, so this returns once the backlog is handed
    /// over. Returns the number of events dispatched over the subscription's life.
    pub(crate) async fn finish(mut self) -> usize {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match self.task.await {
            Ok(dispatched) => {
                debug!(dispatched, "dispatch flushed");
                dispatched
            }
            Err(e) => {
                warn!(error = %e, "dispatch task failed");
                0
            }
        }
    }
}
