//! Worker pool for per-request continuations.
//!
//! This module defines the [`WorkItem`] unit moved through the shared FIFO
//! queue, the [`manager::WorkerPool`] that owns the queue's sending side
//! and coordinates shutdown, and the [`worker::worker_loop`] task body run
//! by each worker.
//!
//! The queue is a single unbounded channel: the dispatch loop is the only
//! producer, and the workers take turns on the receiving end, so items are
//! serviced in arrival order by exactly one worker each.

pub mod manager;
pub mod worker;

use std::sync::Arc;

use bazaar_tonic_core::types::RequestTag;
use tokio::sync::{Mutex, mpsc, oneshot};

/// The unit of work moved through the pool's queue.
#[derive(Debug)]
pub enum WorkItem {
    /// Advance the request slot identified by this tag.
    Resume(RequestTag),
    /// Stop the receiving worker and acknowledge on `response`.
    Shutdown { response: oneshot::Sender<()> },
}

/// Receiving end of the work queue, taken by one worker at a time.
///
/// The async mutex serializes dequeues without ever being held across the
/// execution of an item, which preserves FIFO order and the
/// one-worker-per-item guarantee.
pub type SharedQueue = Arc<Mutex<mpsc::UnboundedReceiver<WorkItem>>>;
