//! Shared types and error definitions used across the `bazaar` gateway.
//!
//! The `common` module defines reusable abstractions that are shared between
//! the gRPC service layer, the worker pool, and the downstream fan-out
//! client.
//!
//! ## Submodules
//!
//! - [`error`] - Centralized service error type used throughout request
//!   handling.
//! - [`types`] - Vendor endpoint addressing and request lifecycle types.
//! - [`proto`] - Generated protobuf bindings for the store and vendor
//!   services, plus the encoded file descriptor set for gRPC reflection.

pub mod error;
pub mod types;

pub use error::{Error, Result};

pub mod proto {
    tonic::include_proto!("bazaar");
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("bazaar_descriptor");
}
