//! Shutdown coordination for the worker pool.
//!
//! The [`WorkerPool`] holds the sending side of the shared work queue and
//! the pool-wide cancellation token. New work flows around it (the dispatch
//! loop pushes directly into the queue); its job is teardown: stop the
//! dispatch loop, tell every worker to exit, and wait a bounded time for
//! each acknowledgement.

use core::time::Duration;

use bazaar_tonic_core::Error;
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

use super::WorkItem;

const SHUTDOWN_ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// Handle to the pool of workers draining the shared FIFO queue.
pub struct WorkerPool {
    queue_tx: mpsc::UnboundedSender<WorkItem>,
    num_workers: usize,
    shutdown_token: CancellationToken,
}

impl WorkerPool {
    pub const fn new(
        queue_tx: mpsc::UnboundedSender<WorkItem>,
        num_workers: usize,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            queue_tx,
            num_workers,
            shutdown_token,
        }
    }

    /// Gracefully shuts down all workers in the pool.
    ///
    /// - Cancels the shared [`CancellationToken`] so the dispatch loop
    ///   stops producing and the handler refuses new requests.
    /// - Enqueues one [`WorkItem::Shutdown`] per worker. The queue is FIFO,
    ///   so items already queued are still serviced first.
    /// - Waits (up to 3 seconds per worker) for shutdown acknowledgements.
    pub async fn shutdown(&self) -> Result<(), Error> {
        tracing::info!("Refusing new requests");
        self.shutdown_token.cancel();

        tracing::debug!("Notifying all workers to shut down");
        let mut shutdown_handles = Vec::with_capacity(self.num_workers);

        for i in 0..self.num_workers {
            let (tx, rx) = oneshot::channel();
            if let Err(e) = self.queue_tx.send(WorkItem::Shutdown { response: tx }) {
                tracing::error!("Failed to send shutdown to worker {i}: {e}");
            } else {
                shutdown_handles.push((i, rx));
            }
        }

        let timeout_futures = shutdown_handles.into_iter().map(|(i, rx)| async move {
            match timeout(SHUTDOWN_ACK_TIMEOUT, rx).await {
                Ok(Ok(())) => {
                    tracing::trace!("Worker shutdown acknowledged ({i})");
                }
                Ok(Err(e)) => {
                    tracing::error!("Worker {i} dropped its shutdown ack: {e}");
                }
                Err(_) => {
                    tracing::warn!("Worker {i} shutdown timed out");
                }
            }
        });

        futures::future::join_all(timeout_futures).await;

        tracing::info!("Worker pool shutdown complete");

        Ok(())
    }
}
