use core::time::Duration;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use bazaar_tonic_core::types::DownstreamEndpoint;
use clap::Parser;

/// Runtime configuration for the `bazaar-tonic-server` binary.
///
/// The two positional parameters mirror the gateway's process contract: the
/// listening port and the worker-pool size. Everything else is tunable via
/// flags or environment variables, with defaults suitable for local use.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "bazaar-tonic-server",
    version,
    about = "A gRPC gateway that aggregates product bids from vendor services"
)]
pub struct CliArgs {
    /// Port to listen on.
    pub port: u16,

    /// Number of workers servicing the request queue.
    ///
    /// A worker is occupied for the full duration of one request's vendor
    /// fan-out, so this bounds the number of simultaneously in-flight
    /// fan-outs. Additional requests queue rather than fail.
    pub workers: usize,

    /// Host to bind the listener on.
    ///
    /// Environment variable: `SERVER_HOST`
    #[arg(long, env = "SERVER_HOST", default_value_t = String::from("127.0.0.1"))]
    pub host: String,

    /// Path to the newline-delimited vendor address file (`host:port` per
    /// line). Read once at startup; a missing file is a fatal error.
    ///
    /// Environment variable: `VENDOR_FILE`
    #[arg(long, env = "VENDOR_FILE", default_value = "./vendor_addresses.txt")]
    pub vendor_file: PathBuf,

    /// Deadline applied to each individual vendor call, in milliseconds.
    ///
    /// A vendor that does not answer within the deadline is skipped; its
    /// bid is omitted from the aggregate.
    ///
    /// Environment variable: `VENDOR_CALL_TIMEOUT_MS`
    #[arg(long, env = "VENDOR_CALL_TIMEOUT_MS", default_value_t = 5_000)]
    pub vendor_call_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub num_workers: usize,
    pub vendor_file: PathBuf,
    pub vendor_call_timeout: Duration,
}

impl ServerConfig {
    /// Socket address string for the TCP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.workers == 0 {
            bail!("WORKERS must be greater than 0");
        }

        if args.vendor_call_timeout_ms == 0 {
            bail!("VENDOR_CALL_TIMEOUT_MS must be greater than 0");
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            num_workers: args.workers,
            vendor_file: args.vendor_file,
            vendor_call_timeout: Duration::from_millis(args.vendor_call_timeout_ms),
        })
    }
}

/// Reads the vendor address file into an ordered endpoint list.
///
/// Blank lines are ignored. The line order defines the bid order in every
/// reply, so it is preserved exactly. Errors (missing file, unparsable
/// address) are fatal to startup, before any port is bound.
pub fn load_vendor_endpoints(path: &Path) -> anyhow::Result<Vec<DownstreamEndpoint>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to open vendor file {}", path.display()))?;

    let mut endpoints = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let endpoint = line
            .parse::<DownstreamEndpoint>()
            .with_context(|| format!("invalid vendor address in {}", path.display()))?;
        endpoints.push(endpoint);
    }

    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};

    static FILE_SEQ: AtomicU32 = AtomicU32::new(0);

    fn write_temp_vendor_file(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "bazaar-vendors-{}-{}.txt",
            std::process::id(),
            FILE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn args(port: u16, workers: usize) -> CliArgs {
        CliArgs {
            port,
            workers,
            host: "127.0.0.1".to_string(),
            vendor_file: PathBuf::from("./vendor_addresses.txt"),
            vendor_call_timeout_ms: 5_000,
        }
    }

    #[test]
    fn rejects_zero_workers() {
        assert!(ServerConfig::try_from(args(50051, 0)).is_err());
    }

    #[test]
    fn builds_listen_addr() {
        let config = ServerConfig::try_from(args(50051, 4)).unwrap();
        assert_eq!(config.listen_addr(), "127.0.0.1:50051");
        assert_eq!(config.vendor_call_timeout, Duration::from_millis(5_000));
    }

    #[test]
    fn missing_vendor_file_is_fatal() {
        let path = std::env::temp_dir().join("bazaar-no-such-vendor-file.txt");
        assert!(load_vendor_endpoints(&path).is_err());
    }

    #[test]
    fn loads_endpoints_in_file_order() {
        let path = write_temp_vendor_file("localhost:50052\n\n  localhost:50053\n");
        let endpoints = load_vendor_endpoints(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].authority(), "localhost:50052");
        assert_eq!(endpoints[1].authority(), "localhost:50053");
    }

    #[test]
    fn empty_file_yields_empty_endpoint_list() {
        let path = write_temp_vendor_file("");
        let endpoints = load_vendor_endpoints(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert!(endpoints.is_empty());
    }

    #[test]
    fn malformed_address_is_fatal() {
        let path = write_temp_vendor_file("localhost:50052\nnot-an-address\n");
        let result = load_vendor_endpoints(&path);
        let _ = std::fs::remove_file(&path);

        assert!(result.is_err());
    }
}
