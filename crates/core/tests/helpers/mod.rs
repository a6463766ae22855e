#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use glint_core::{
    AnalyticsError, Batch, Delivery, ManualClock, MemoryStorage, Metadata, Storage, Tracker,
    TrackerBuilder, TrackerConfig, Transport, enrich::PageEnvironment,
};
use reqwest::Url;
use serde_json::json;
use tokio::sync::Semaphore;

/// Records every batch it is given. Optionally holds each send until a
/// permit is released, to keep a flush "in flight".
#[derive(Default)]
pub struct RecordingTransport {
    batches: Mutex<Vec<Batch>>,
    gate: Option<Semaphore>,
    outcome: Option<Delivery>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            outcome: Some(Delivery::Failed("connection refused".into())),
            ..Self::default()
        })
    }

    pub fn release(&self, sends: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(sends);
        }
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn event_types(&self, batch: usize) -> Vec<String> {
        self.batches()[batch]
            .events
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, batch: Arc<Batch>) -> Delivery {
        self.batches.lock().unwrap().push((*batch).clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.outcome.clone().unwrap_or(Delivery::Sent(204))
    }
}

/// Storage whose every call fails, like a browser with storage disabled.
pub struct BrokenStorage;

impl Storage for BrokenStorage {
    fn get(&self, key: &str) -> glint_core::Result<Option<String>> {
        Err(AnalyticsError::Storage {
            key: key.to_string(),
            reason: "SecurityError: storage is disabled".into(),
        })
    }

    fn set(&self, key: &str, _value: &str) -> glint_core::Result<()> {
        Err(AnalyticsError::Storage {
            key: key.to_string(),
            reason: "QuotaExceededError".into(),
        })
    }
}

pub struct Harness {
    pub tracker: Tracker,
    pub transport: Arc<RecordingTransport>,
    pub clock: ManualClock,
    pub env: Arc<PageEnvironment>,
    pub config: TrackerConfig,
}

pub fn page_env() -> Arc<PageEnvironment> {
    Arc::new(
        PageEnvironment::new(Url::parse("https://shine.example/?utm_source=instagram#hero").unwrap())
            .with_user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0")
            .with_viewport(1440, 900),
    )
}

pub fn harness_with(
    config: TrackerConfig,
    transport: Arc<RecordingTransport>,
    storage: Arc<dyn Storage>,
) -> Harness {
    let clock = ManualClock::new(1_700_000_000_000);
    let env = page_env();
    let tracker = TrackerBuilder::new(config.clone())
        .storage(storage)
        .environment(env.clone())
        .clock(Arc::new(clock.clone()))
        .transport(transport.clone())
        .build()
        .unwrap();

    Harness {
        tracker,
        transport,
        clock,
        env,
        config,
    }
}

pub fn harness() -> Harness {
    harness_with(
        TrackerConfig::default(),
        RecordingTransport::new(),
        Arc::new(MemoryStorage::new()),
    )
}

pub fn seq(i: usize) -> Metadata {
    let mut m = Metadata::new();
    m.insert("seq".into(), json!(i));
    m
}

pub fn seqs(batch: &Batch) -> Vec<u64> {
    batch
        .events
        .iter()
        .filter_map(|e| e.metadata.get("seq").and_then(|v| v.as_u64()))
        .collect()
}

/// Lets spawned timer/transport tasks run to their next await point.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

pub const FLUSH_INTERVAL: Duration = Duration::from_secs(5);
