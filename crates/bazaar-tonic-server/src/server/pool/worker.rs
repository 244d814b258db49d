use core::time::Duration;
use std::sync::Arc;

use bazaar_tonic_core::{
    proto::ProductReply,
    types::{DownstreamEndpoint, RequestTag},
};
use tokio::sync::mpsc;

use super::{SharedQueue, WorkItem};
use crate::server::{
    fanout::coordinator::gather_bids,
    registry::{Delivery, RequestRegistry, Resumption},
};

/// Everything a worker needs to advance request slots.
///
/// Shared by all workers; the endpoint list is read-only for the serving
/// lifetime and the registry serializes slot mutations internally.
pub struct WorkerCtx {
    pub registry: Arc<RequestRegistry>,
    pub endpoints: Arc<Vec<DownstreamEndpoint>>,
    pub accept_tx: mpsc::Sender<RequestTag>,
    pub call_timeout: Duration,
}

/// Worker task draining the shared FIFO work queue.
///
/// Each item resumes one request slot. Resuming an arrival means the worker
/// is occupied for the full duration of that request's vendor fan-out; the
/// pool size therefore bounds the number of simultaneously in-flight
/// fan-outs. Before any fan-out work begins, the worker creates and
/// publishes the replacement accept slot so the server never refuses a
/// concurrently arriving request.
///
/// Designed to be spawned as a Tokio task; runs until the queue closes or a
/// [`WorkItem::Shutdown`] is dequeued.
pub async fn worker_loop(worker_id: usize, queue: SharedQueue, ctx: Arc<WorkerCtx>) {
    tracing::trace!("Worker {worker_id} started");

    loop {
        // Hold the queue lock only for the dequeue itself, never while
        // executing the item.
        let item = { queue.lock().await.recv().await };

        let Some(item) = item else {
            break;
        };

        match item {
            WorkItem::Resume(tag) => resume(worker_id, tag, &ctx).await,
            WorkItem::Shutdown { response } => {
                tracing::debug!("Worker {worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    tracing::error!("Worker {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    tracing::trace!("Worker {worker_id} stopped");
}

async fn resume(worker_id: usize, tag: RequestTag, ctx: &WorkerCtx) {
    match ctx.registry.begin_resume(tag) {
        Ok(Resumption::Dispatch { product_name }) => {
            dispatch(worker_id, tag, product_name, ctx).await;
        }
        Ok(Resumption::Destroy) => {
            if let Err(e) = ctx.registry.destroy(tag) {
                tracing::warn!("Worker {worker_id}: {e}");
            }
        }
        Err(e) => {
            tracing::warn!("Worker {worker_id}: dropping work item: {e}");
        }
    }
}

/// Runs one request from dispatch through completion.
///
/// The replacement accept slot is published first, before the fan-out, so
/// exactly one accepting slot exists at all times while serving.
async fn dispatch(worker_id: usize, tag: RequestTag, product_name: String, ctx: &WorkerCtx) {
    let replacement = ctx.registry.insert_accepting();
    if ctx.accept_tx.send(replacement).await.is_err() {
        // Accept mailbox closed: the service is going away. Reclaim the
        // replacement so construction and destruction stay balanced.
        tracing::warn!("Worker {worker_id}: accept mailbox closed");
        if let Err(e) = ctx.registry.abort_accepting(replacement) {
            tracing::warn!("Worker {worker_id}: {e}");
        }
    }

    let bids = gather_bids(&product_name, &ctx.endpoints, ctx.call_timeout).await;
    let reply = ProductReply { products: bids };

    match ctx.registry.complete(tag, reply) {
        Ok(Delivery::Delivered) => {}
        Ok(Delivery::Abandoned) => {
            // The client is gone, so no finish acknowledgement will ever
            // come through the completion channel for this slot.
            tracing::warn!("Worker {worker_id}: client went away before completion of tag {tag}");
            if let Err(e) = ctx.registry.destroy(tag) {
                tracing::warn!("Worker {worker_id}: {e}");
            }
        }
        Err(e) => {
            tracing::warn!("Worker {worker_id}: {e}");
        }
    }
}
