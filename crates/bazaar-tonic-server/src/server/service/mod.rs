//! gRPC service implementation and engine wiring.
//!
//! This module contains the client-facing entry point of the gateway. The
//! handler claims the pending accept slot, feeds the completion channel,
//! and waits for a worker to complete the request; everything in between —
//! dispatch, fan-out, slot destruction — happens in the engine tasks wired
//! up at construction time.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`StoreSvc`).

pub mod handler;
