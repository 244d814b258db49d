//! Error types for the store aggregation gateway.
//!
//! This module defines the central `Error` enum, which captures all
//! recoverable and reportable error cases within the request-handling
//! engine. It implements `From<Error>` for `tonic::Status` to enable
//! seamless gRPC error propagation to clients with appropriate status codes
//! and messages.
//!
//! ## Error Cases
//! - `ChannelError`: An internal communication failure between tasks or
//!   workers.
//! - `StaleTag`: A completion event referenced a request slot that no longer
//!   exists or is in the wrong lifecycle state.
//! - `VendorUnavailable`: A single downstream vendor call failed; absorbed
//!   by the fan-out and never surfaced to the calling client.
//! - `InvalidRequest`: The client request was malformed.
//! - `ServiceShutdown`: A request arrived while the service was shutting
//!   down.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the store aggregation gateway.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// Internal channel send/receive failure (e.g., closed channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// A completion event named a request slot that is gone or not in the
    /// expected lifecycle state.
    #[error("Stale request tag {tag}: {context}")]
    StaleTag { tag: u64, context: String },

    /// A downstream vendor call failed or timed out. Recoverable: the
    /// vendor's bid is simply omitted from the aggregate.
    #[error("Vendor {endpoint} unavailable: {reason}")]
    VendorUnavailable { endpoint: String, reason: String },

    /// The client request was invalid.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {}", context))
            }
            Error::StaleTag { tag, context } => {
                Status::internal(format!("Stale request tag {}: {}", tag, context))
            }
            Error::VendorUnavailable { endpoint, reason } => {
                Status::unavailable(format!("Vendor {} unavailable: {}", endpoint, reason))
            }
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}
