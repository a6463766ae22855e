use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    transport::{Delivery, Transport},
    types::Batch,
};

/// Tries `primary`; only a `Rejected` outcome moves on to `fallback`.
pub struct FallbackTransport {
    primary: Arc<dyn Transport>,
    fallback: Arc<dyn Transport>,
}

impl FallbackTransport {
    pub fn new(primary: Arc<dyn Transport>, fallback: Arc<dyn Transport>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Transport for FallbackTransport {
    fn name(&self) -> &'static str {
        "beacon+http"
    }

    async fn send(&self, batch: Arc<Batch>) -> Delivery {
        match self.primary.send(Arc::clone(&batch)).await {
            Delivery::Rejected(reason) => {
                debug!(primary = self.primary.name(), %reason, "falling back");
                self.fallback.send(batch).await
            }
            outcome => outcome,
        }
    }

    fn detached_failures(&self) -> u64 {
        self.primary.detached_failures() + self.fallback.detached_failures()
    }

    async fn close(&self) {
        self.primary.close().await;
        self.fallback.close().await;
    }
}
