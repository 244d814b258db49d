#![doc = include_str!("../README.md")]

use bazaar_tonic_core::proto::{FILE_DESCRIPTOR_SET, store_service_server::StoreServiceServer};
use bazaar_tonic_server::server::config::{CliArgs, ServerConfig, load_vendor_endpoints};
use bazaar_tonic_server::server::service::handler::StoreSvc;
use bazaar_tonic_server::server::telemetry::init_telemetry;
use bazaar_tonic_core::types::DownstreamEndpoint;
use clap::Parser;
use futures::Stream;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::server::Connected;
use tonic::{codec::CompressionEncoding, transport::Server};
use tonic_health::server::HealthReporter;
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry();

    // A missing or malformed vendor file is fatal before any port is bound.
    let endpoints = load_vendor_endpoints(&config.vendor_file)?;

    let addr = config.listen_addr();
    let tcp = TcpListener::bind(&addr).await?;
    let incoming = TcpListenerStream::new(tcp);
    log_startup_info(&addr, &config, &endpoints);
    run_server_with_incoming(incoming, config, endpoints).await
}

async fn run_server_with_incoming<I, IO, IE>(
    incoming: I,
    config: ServerConfig,
    endpoints: Vec<DownstreamEndpoint>,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<StoreServiceServer<StoreSvc>>()
        .await;

    let service = StoreSvc::new(&config, endpoints);

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service.clone())
        .add_service(reflection)
        .add_service(build_store_service(service.clone()))
        .serve_with_incoming_shutdown(incoming, shutdown_signal(service, health_reporter))
        .await?;

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(addr: &str, config: &ServerConfig, endpoints: &[DownstreamEndpoint]) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting store gateway on {} with full config: {:#?}, vendors: {:?}",
            addr,
            config,
            endpoints
        );
    } else {
        tracing::info!(
            "Starting store gateway on {} with {} workers and {} vendors",
            addr,
            config.num_workers,
            endpoints.len()
        );
    }
}

fn build_store_service(service: StoreSvc) -> StoreServiceServer<StoreSvc> {
    StoreServiceServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}

async fn shutdown_signal(service: StoreSvc, health_reporter: HealthReporter) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");

    // 1. Publish the status
    health_reporter
        .set_not_serving::<StoreServiceServer<StoreSvc>>()
        .await;

    // 2. Perform graceful shutdown
    if let Err(e) = service.shutdown().await {
        tracing::error!("Error during service shutdown: {:?}", e);
    }
}
