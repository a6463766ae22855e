use std::{
    pin::Pin,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use reqwest::Url;
use tokio::{
    runtime::Handle,
    sync::mpsc,
    task::{JoinHandle, JoinSet},
};
use tracing::{debug, warn};

use crate::{
    error::AnalyticsError,
    transport::{Delivery, HttpTransport, Transport},
    types::Batch,
};

pub const DEFAULT_BEACON_BUFFER: usize = 64;

type DrainTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Fire-and-forget delivery. Batches are encoded up front and handed to a
/// detached sender task, so a send returns before any network I/O and the
/// request outlives whoever queued it.
pub struct BeaconTransport {
    outbox: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    drain: Mutex<Option<JoinHandle<()>>>,
    failures: Arc<AtomicU64>,
}

impl BeaconTransport {
    pub fn spawn_on(handle: &Handle, endpoint: Url, buffer: usize) -> Self {
        let (transport, drain_task) = Self::new(HttpTransport::new(endpoint), buffer);
        *lock(&transport.drain) = Some(handle.spawn(drain_task));
        transport
    }

    /// Returns the transport and the task that performs the requests. The
    /// caller decides where the task runs.
    pub fn new(http: HttpTransport, buffer: usize) -> (Self, DrainTask) {
        let (outbox, inbox) = mpsc::channel::<Vec<u8>>(buffer.max(1));
        let failures = Arc::new(AtomicU64::new(0));
        let drain_task = Box::pin(drain(http, inbox, Arc::clone(&failures)));

        let transport = Self {
            outbox: Mutex::new(Some(outbox)),
            drain: Mutex::new(None),
            failures,
        };
        (transport, drain_task)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// One request per batch, run concurrently. Once the outbox closes, waits
/// for every request already started.
async fn drain(http: HttpTransport, mut inbox: mpsc::Receiver<Vec<u8>>, failures: Arc<AtomicU64>) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            body = inbox.recv() => {
                let Some(body) = body else { break };
                let http = http.clone();
                let failures = Arc::clone(&failures);
                in_flight.spawn(async move {
                    match http.post(body).await {
                        Delivery::Failed(reason) => {
                            failures.fetch_add(1, Ordering::Relaxed);
                            warn!(%reason, "beacon request failed, batch discarded");
                        }
                        outcome => debug!(?outcome, "beacon delivered"),
                    }
                });
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    while in_flight.join_next().await.is_some() {}
}

#[async_trait]
impl Transport for BeaconTransport {
    fn name(&self) -> &'static str {
        "beacon"
    }

    async fn send(&self, batch: Arc<Batch>) -> Delivery {
        let body = match batch.to_json() {
            Ok(body) => body,
            Err(e) => return Delivery::Rejected(e.to_string()),
        };

        let outbox = lock(&self.outbox);
        let Some(outbox) = outbox.as_ref() else {
            return Delivery::Rejected(AnalyticsError::TransportClosed.to_string());
        };
        match outbox.try_send(body) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Rejected("beacon outbox full".into()),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Delivery::Rejected(AnalyticsError::TransportClosed.to_string())
            }
        }
    }

    fn detached_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    async fn close(&self) {
        drop(lock(&self.outbox).take());
        let drain = lock(&self.drain).take();
        if let Some(drain) = drain {
            if let Err(e) = drain.await {
                warn!(error = %e, "beacon sender task ended abnormally");
            }
        }
    }
}
