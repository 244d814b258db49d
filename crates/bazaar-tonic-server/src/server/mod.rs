//! Server-side components of the `bazaar` aggregation gateway.
//!
//! This module contains the building blocks necessary to run the gateway:
//! the request registry, the completion dispatch loop, the worker pool, the
//! downstream fan-out client, and the gRPC service wiring.
//!
//! ## Submodules
//!
//! - [`config`] - CLI arguments, runtime configuration, and vendor file
//!   loading.
//! - [`dispatch`] - The single completion dispatch loop feeding the worker
//!   pool.
//! - [`fanout`] - The per-vendor downstream client and the bid gatherer.
//! - [`pool`] - Worker pool consuming the shared FIFO work queue.
//! - [`registry`] - Per-request slots and their lifecycle bookkeeping.
//! - [`service`] - The gRPC `StoreService` implementation.
//! - [`telemetry`] - Structured logging initialization and service
//!   counters.
//!
//! These components are wired together in [`service::handler::StoreSvc`]
//! and served from the binary's `main.rs`.

pub mod config;
pub mod dispatch;
pub mod fanout;
pub mod pool;
pub mod registry;
pub mod service;
pub mod telemetry;
