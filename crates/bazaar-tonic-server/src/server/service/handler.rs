//! gRPC service implementation for the store aggregation gateway.
//!
//! This module defines [`StoreSvc`], the concrete implementation of the
//! [`StoreService`] gRPC service defined in the protobuf specification. One
//! call to `GetProducts` claims the pending accept slot, rides the
//! completion channel into the worker pool, fans out to every configured
//! vendor, and resolves with the aggregated bid list.
//!
//! ## Responsibilities
//!
//! - Spawn the completion dispatch loop and the worker pool.
//! - Seed the accept mailbox with the first accepting slot.
//! - Bridge each incoming RPC onto the engine: claim, attach, emit the
//!   arrival event, await the reply, acknowledge the finish.
//! - Handle graceful shutdown.

use std::sync::Arc;

use bazaar_tonic_core::{
    Error,
    proto::{ProductQuery, ProductReply, store_service_server::StoreService},
    types::{DownstreamEndpoint, RequestTag},
};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

use crate::server::{
    config::ServerConfig,
    dispatch::{CompletionEvent, dispatch_loop},
    pool::{
        manager::WorkerPool,
        worker::{WorkerCtx, worker_loop},
    },
    registry::{RegistryStats, RequestRegistry},
    telemetry::increment_requests,
};

/// The store-facing gRPC service.
///
/// Cloning is cheap: every clone shares the same registry, accept mailbox,
/// completion channel, and worker pool.
#[derive(Clone)]
pub struct StoreSvc {
    registry: Arc<RequestRegistry>,
    accept_rx: Arc<Mutex<mpsc::Receiver<RequestTag>>>,
    completion_tx: mpsc::UnboundedSender<CompletionEvent>,
    worker_pool: Arc<WorkerPool>,
    shutdown_token: CancellationToken,
}

impl StoreSvc {
    /// Creates the service and spawns the engine: one dispatch-loop task
    /// plus `config.num_workers` worker tasks sharing a FIFO queue.
    ///
    /// The first accepting slot is created and published here, so an accept
    /// registration exists before the listener takes its first connection.
    /// Each worker replaces the slot it consumes before fanning out, which
    /// keeps exactly one accepting slot alive at all times while serving.
    pub fn new(config: &ServerConfig, endpoints: Vec<DownstreamEndpoint>) -> Self {
        let registry = Arc::new(RequestRegistry::new());
        let shutdown_token = CancellationToken::new();

        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        // Capacity 1: the mailbox holds the tag of the single pending
        // accept slot. Consumed by the handler, refilled by the worker
        // that moves the slot out of accepting.
        let (accept_tx, accept_rx) = mpsc::channel(1);

        let first = registry.insert_accepting();
        if accept_tx.try_send(first).is_err() {
            tracing::error!("Failed to seed the accept mailbox");
        }

        tokio::spawn(dispatch_loop(
            completion_rx,
            queue_tx.clone(),
            shutdown_token.clone(),
        ));

        let queue = Arc::new(Mutex::new(queue_rx));
        let ctx = Arc::new(WorkerCtx {
            registry: Arc::clone(&registry),
            endpoints: Arc::new(endpoints),
            accept_tx,
            call_timeout: config.vendor_call_timeout,
        });

        for worker_id in 0..config.num_workers {
            tokio::spawn(worker_loop(worker_id, Arc::clone(&queue), Arc::clone(&ctx)));
        }

        let worker_pool = WorkerPool::new(queue_tx, config.num_workers, shutdown_token.clone());

        Self {
            registry,
            accept_rx: Arc::new(Mutex::new(accept_rx)),
            completion_tx,
            worker_pool: Arc::new(worker_pool),
            shutdown_token,
        }
    }

    /// Initiates a graceful shutdown of the engine.
    ///
    /// New requests are refused, the dispatch loop stops, and the shutdown
    /// blocks until each worker acknowledges termination (bounded).
    pub async fn shutdown(&self) -> Result<(), Error> {
        self.worker_pool.shutdown().await
    }

    /// Construction/destruction counters of the request registry.
    ///
    /// After all in-flight requests drain, `created - destroyed` equals the
    /// number of live slots: the one pending accept slot.
    pub fn registry_stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    async fn claim_accept(&self) -> Result<RequestTag, Error> {
        let mut accept_rx = self.accept_rx.lock().await;
        accept_rx.recv().await.ok_or(Error::ServiceShutdown)
    }

    fn emit(&self, event: CompletionEvent) -> Result<(), Error> {
        self.completion_tx
            .send(event)
            .map_err(|_| Error::ChannelError {
                context: "completion channel closed".to_string(),
            })
    }
}

#[tonic::async_trait]
impl StoreService for StoreSvc {
    /// Handles one product query.
    ///
    /// Claims the pending accept slot (waiting briefly if its replacement
    /// has not been published yet), attaches the query, and emits the
    /// arrival event. The reply arrives on a oneshot once a worker has
    /// finished the vendor fan-out; receiving it doubles as the transport
    /// confirmation, so the finish acknowledgement is emitted before the
    /// response goes back out.
    #[tracing::instrument(skip_all, fields(product = %req.get_ref().product_name))]
    async fn get_products(
        &self,
        req: Request<ProductQuery>,
    ) -> Result<Response<ProductReply>, Status> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown.into());
        }

        increment_requests();
        let product_name = req.into_inner().product_name;

        let tag = self.claim_accept().await?;
        let reply_rx = self.registry.attach(tag, product_name)?;
        self.emit(CompletionEvent::request_arrived(tag))?;

        let reply = reply_rx.await.map_err(|_| {
            Status::from(Error::ChannelError {
                context: "reply channel closed before completion".to_string(),
            })
        })?;

        if self.emit(CompletionEvent::finish_acknowledged(tag)).is_err() {
            // Shutdown race: the slot will not be reclaimed, but the reply
            // is already in hand and still goes out.
            tracing::warn!("Finish acknowledgement for tag {tag} was dropped");
        }

        Ok(Response::new(reply))
    }
}
