pub mod beacon;
pub mod fallback;
pub mod http;

pub use beacon::*;
pub use fallback::*;
pub use http::*;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;

use crate::types::Batch;

/// Result of handing a batch to a transport. Nothing acts on it beyond
/// logging and counters; delivery is at-most-once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by a fire-and-forget path; the outcome will never be known.
    Queued,
    /// A response came back. The status is not inspected further.
    Sent(u16),
    /// The transport could not take the batch; a fallback may try.
    Rejected(String),
    /// The attempt was made and failed. Terminal.
    Failed(String),
}

impl Delivery {
    pub fn is_failure(&self) -> bool {
        matches!(self, Delivery::Rejected(_) | Delivery::Failed(_))
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    async fn send(&self, batch: Arc<Batch>) -> Delivery;

    /// Requests that failed after `send` had already returned `Queued`.
    fn detached_failures(&self) -> u64 {
        0
    }

    /// Stops accepting batches and waits for requests still in flight.
    async fn close(&self) {}
}

/// Picks the delivery strategy once, at startup. With a tokio runtime
/// available the beacon path (detached background sender) is preferred and
/// falls back to a direct request; without one only the direct request is
/// usable.
pub fn probe_transport(endpoint: Url) -> Arc<dyn Transport> {
    let http = HttpTransport::new(endpoint.clone());

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let beacon = BeaconTransport::spawn_on(&handle, endpoint, DEFAULT_BEACON_BUFFER);
            tracing::debug!("beacon transport available");
            Arc::new(FallbackTransport::new(Arc::new(beacon), Arc::new(http)))
        }
        Err(_) => {
            tracing::debug!("no runtime for beacon transport, using direct requests");
            Arc::new(http)
        }
    }
}
