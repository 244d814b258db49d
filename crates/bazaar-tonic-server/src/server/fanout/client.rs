use core::time::Duration;

use bazaar_tonic_core::{
    Error, Result,
    proto::{BidQuery, ProductInfo, vendor_service_client::VendorServiceClient},
    types::DownstreamEndpoint,
};
use tonic::transport::Endpoint;

/// Client for a single vendor endpoint.
///
/// Each invocation performs one request-reply call on a fresh channel; no
/// connection is reused across calls. No retries, no circuit breaking: a
/// failure is reported to the caller and absorbed there.
pub struct VendorClient {
    endpoint: DownstreamEndpoint,
}

impl VendorClient {
    pub const fn new(endpoint: DownstreamEndpoint) -> Self {
        Self { endpoint }
    }

    /// Requests one bid for `product_name` from this vendor.
    ///
    /// The deadline covers the whole call, connect included. Any transport
    /// error, non-OK status, or deadline miss comes back as
    /// [`Error::VendorUnavailable`]; it never panics and never aborts the
    /// caller.
    pub async fn get_product_bid(
        &self,
        product_name: &str,
        deadline: Duration,
    ) -> Result<ProductInfo> {
        let call = self.call_vendor(product_name);

        match tokio::time::timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(self.unavailable("deadline exceeded".to_string())),
        }
    }

    async fn call_vendor(&self, product_name: &str) -> Result<ProductInfo> {
        let channel = Endpoint::from_shared(self.endpoint.uri())
            .map_err(|e| self.unavailable(format!("invalid uri: {e}")))?
            .connect()
            .await
            .map_err(|e| self.unavailable(format!("connect failed: {e}")))?;

        let mut client = VendorServiceClient::new(channel);

        let query = BidQuery {
            product_name: product_name.to_string(),
        };

        let reply = client
            .get_product_bid(query)
            .await
            .map_err(|status| {
                self.unavailable(format!("{}: {}", status.code(), status.message()))
            })?
            .into_inner();

        Ok(ProductInfo {
            price: reply.price,
            vendor_id: reply.vendor_id,
        })
    }

    fn unavailable(&self, reason: String) -> Error {
        Error::VendorUnavailable {
            endpoint: self.endpoint.authority().to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_endpoint_reports_unavailable() {
        // Port 1 on loopback is essentially never listening.
        let endpoint: DownstreamEndpoint = "127.0.0.1:1".parse().unwrap();
        let client = VendorClient::new(endpoint);

        let result = client
            .get_product_bid("widget", Duration::from_secs(2))
            .await;

        assert!(matches!(result, Err(Error::VendorUnavailable { .. })));
    }

    #[tokio::test]
    async fn silent_endpoint_hits_the_deadline() {
        // A bound listener that never speaks HTTP/2 stalls the handshake,
        // so the per-call deadline is what gets us out.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let endpoint: DownstreamEndpoint = addr.to_string().parse().unwrap();
        let client = VendorClient::new(endpoint);

        let result = client
            .get_product_bid("widget", Duration::from_millis(200))
            .await;

        assert!(matches!(result, Err(Error::VendorUnavailable { .. })));
        drop(listener);
    }
}
