//! The completion dispatch loop.
//!
//! A single task owns the receiving end of the completion channel. Every
//! RPC event — a request arriving on the accept slot, or the transport
//! acknowledging that a finish was delivered — lands here as a
//! [`CompletionEvent`] and is handed straight to the worker pool's queue.
//!
//! The loop never advances a request itself: it is the sole producer into
//! the work queue and must stay free of fan-out, I/O, or any other blocking
//! work, otherwise it becomes the throughput bottleneck for the whole
//! server. Malformed events (`ok == false`) are logged and dropped rather
//! than treated as fatal, so one bad event cannot take the process down.

use bazaar_tonic_core::types::RequestTag;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::server::pool::WorkItem;

/// One event from the completion channel.
///
/// `ok` mirrors the success flag of the underlying completion mechanism:
/// `false` marks an event that did not complete cleanly and must not be
/// resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionEvent {
    RequestArrived { tag: RequestTag, ok: bool },
    FinishAcknowledged { tag: RequestTag, ok: bool },
}

impl CompletionEvent {
    pub fn request_arrived(tag: RequestTag) -> Self {
        Self::RequestArrived { tag, ok: true }
    }

    pub fn finish_acknowledged(tag: RequestTag) -> Self {
        Self::FinishAcknowledged { tag, ok: true }
    }

    fn parts(self) -> (RequestTag, bool) {
        match self {
            Self::RequestArrived { tag, ok } | Self::FinishAcknowledged { tag, ok } => (tag, ok),
        }
    }
}

/// Drains the completion channel and feeds the worker pool.
///
/// Runs until the shutdown token fires or every event sender is gone.
pub async fn dispatch_loop(
    mut events: mpsc::UnboundedReceiver<CompletionEvent>,
    queue_tx: mpsc::UnboundedSender<WorkItem>,
    shutdown_token: CancellationToken,
) {
    tracing::debug!("Dispatch loop started");

    loop {
        let event = tokio::select! {
            () = shutdown_token.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let (tag, ok) = event.parts();
        if !ok {
            tracing::warn!("Dropping failed completion event for tag {tag}");
            continue;
        }

        if queue_tx.send(WorkItem::Resume(tag)).is_err() {
            tracing::warn!("Work queue closed; dropping event for tag {tag}");
            break;
        }
    }

    tracing::debug!("Dispatch loop stopped");
}
