use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::{
    transport::{Delivery, Transport},
    types::Batch,
};

/// Direct POST of the JSON batch. No timeout and no retry; the response
/// body is never read and any status counts as sent.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Posts an already-encoded body.
    pub(crate) async fn post(&self, body: Vec<u8>) -> Delivery {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status();
                if !status.is_success() {
                    debug!(%status, "ingestion endpoint returned non-success, ignoring");
                }
                Delivery::Sent(status.as_u16())
            }
            Err(e) => Delivery::Failed(e.to_string()),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, batch: Arc<Batch>) -> Delivery {
        match batch.to_json() {
            Ok(body) => self.post(body).await,
            Err(e) => Delivery::Failed(e.to_string()),
        }
    }
}
