use core::time::Duration;

use bazaar_tonic_core::{proto::ProductInfo, types::DownstreamEndpoint};

use super::client::VendorClient;
use crate::server::telemetry::increment_vendor_failures;

/// Collects one bid per reachable vendor for `product_name`.
///
/// All vendor calls are issued concurrently, each under its own deadline,
/// and joined in endpoint order — so the output ordering always equals the
/// vendor-configuration ordering, independent of response latency, while
/// the caller is occupied for the max of the vendor latencies rather than
/// their sum.
///
/// A failed call is logged and skipped; its absence from the returned list
/// is the only signal. An empty endpoint list yields an empty bid list.
pub async fn gather_bids(
    product_name: &str,
    endpoints: &[DownstreamEndpoint],
    deadline: Duration,
) -> Vec<ProductInfo> {
    let calls = endpoints.iter().map(|endpoint| {
        let client = VendorClient::new(endpoint.clone());
        async move {
            match client.get_product_bid(product_name, deadline).await {
                Ok(bid) => Some(bid),
                Err(e) => {
                    increment_vendor_failures();
                    tracing::warn!("Skipping vendor bid: {e}");
                    None
                }
            }
        }
    });

    futures::future::join_all(calls)
        .await
        .into_iter()
        .flatten()
        .collect()
}
