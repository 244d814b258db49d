//! # Common Gateway Types
//!
//! This module defines the shared types used by the request-handling engine
//! and the downstream fan-out client. It keeps the client and server
//! components on a consistent contract for how vendors are addressed and
//! how in-flight requests are identified.
//!
//! ## Overview
//!
//! - [`DownstreamEndpoint`] - a validated `host:port` vendor address
//! - [`RequestTag`] - the generated identifier of an in-flight request slot
//! - [`Lifecycle`] - the per-request state machine phases
//!
//! The endpoint list is loaded once at startup and shared read-only for the
//! entire serving lifetime; no synchronization is required for reads.

use core::fmt;
use core::str::FromStr;

use crate::error::Error;

/// Identifier of an in-flight request slot in the server's registry.
///
/// Tags are generated from a monotonic counter. They replace any notion of
/// passing object addresses through the completion channel: a tag that no
/// longer resolves in the registry is simply stale.
pub type RequestTag = u64;

/// Lifecycle phase of one accepted request.
///
/// A slot is created in `Accepting`, moves to `Dispatching` exactly once
/// when a worker picks up its arrival event, and is destroyed after
/// `Finishing` once the finish acknowledgement has been observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Accepting,
    Dispatching,
    Finishing,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Accepting => f.write_str("accepting"),
            Lifecycle::Dispatching => f.write_str("dispatching"),
            Lifecycle::Finishing => f.write_str("finishing"),
        }
    }
}

/// Address of one downstream vendor service.
///
/// Parsed from a `host:port` line in the vendor address file. The wire
/// scheme is plain HTTP/2 in the reference configuration, so [`uri`] yields
/// an `http://` URI suitable for a tonic channel.
///
/// [`uri`]: DownstreamEndpoint::uri
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamEndpoint {
    authority: String,
}

impl DownstreamEndpoint {
    /// The `host:port` authority of this endpoint.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Connection URI for a tonic channel.
    pub fn uri(&self) -> String {
        format!("http://{}", self.authority)
    }
}

impl FromStr for DownstreamEndpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (host, port) = trimmed.rsplit_once(':').ok_or_else(|| Error::InvalidRequest {
            reason: format!("vendor address '{trimmed}' is not host:port"),
        })?;

        if host.is_empty() {
            return Err(Error::InvalidRequest {
                reason: format!("vendor address '{trimmed}' has an empty host"),
            });
        }

        if port.parse::<u16>().is_err() {
            return Err(Error::InvalidRequest {
                reason: format!("vendor address '{trimmed}' has an invalid port"),
            });
        }

        Ok(Self {
            authority: trimmed.to_string(),
        })
    }
}

impl fmt::Display for DownstreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_port() {
        let ep: DownstreamEndpoint = "localhost:50052".parse().unwrap();
        assert_eq!(ep.authority(), "localhost:50052");
        assert_eq!(ep.uri(), "http://localhost:50052");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let ep: DownstreamEndpoint = "  10.0.0.7:9000\t".parse().unwrap();
        assert_eq!(ep.authority(), "10.0.0.7:9000");
    }

    #[test]
    fn rejects_missing_port() {
        assert!("localhost".parse::<DownstreamEndpoint>().is_err());
    }

    #[test]
    fn rejects_empty_host() {
        assert!(":50052".parse::<DownstreamEndpoint>().is_err());
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!("localhost:grpc".parse::<DownstreamEndpoint>().is_err());
        assert!("localhost:70000".parse::<DownstreamEndpoint>().is_err());
    }

    #[test]
    fn displays_as_authority() {
        let ep: DownstreamEndpoint = "vendor-a:4000".parse().unwrap();
        assert_eq!(ep.to_string(), "vendor-a:4000");
    }
}
