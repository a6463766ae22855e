use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::{
    clock::{Clock, SystemClock},
    config::TrackerConfig,
    enrich::{Enricher, Environment, PageEnvironment},
    events::{Tracker, tracker::TrackerInner},
    session::{FileStorage, MemoryStorage, SessionStore, Storage},
    transport::{Transport, probe_transport},
};

/// Assembles a [`Tracker`]. Every collaborator has a default: file storage
/// under the user data dir, an empty page environment, the system clock and
/// the probed transport.
pub struct TrackerBuilder {
    cfg: TrackerConfig,
    storage: Option<Arc<dyn Storage>>,
    env: Option<Arc<dyn Environment>>,
    clock: Option<Arc<dyn Clock>>,
    transport: Option<Arc<dyn Transport>>,
}

impl TrackerBuilder {
    pub fn new(cfg: TrackerConfig) -> Self {
        Self {
            cfg,
            storage: None,
            env: None,
            clock: None,
            transport: None,
        }
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.cfg
    }

    pub fn build(self) -> Result<Tracker> {
        self.cfg.validate()?;

        let storage = self.storage.unwrap_or_else(default_storage);
        let env = self
            .env
            .unwrap_or_else(|| Arc::new(PageEnvironment::default()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let transport = self
            .transport
            .unwrap_or_else(|| probe_transport(self.cfg.endpoint.clone()));

        let sessions = SessionStore::new(
            storage,
            Arc::clone(&clock),
            self.cfg.session_ttl_ms(),
            &self.cfg.storage_namespace,
        );
        let enricher = Enricher::new(env, Arc::new(sessions));

        Ok(Tracker::from_inner(TrackerInner::new(
            self.cfg.max_queue,
            self.cfg.batch_size,
            self.cfg.flush_interval,
            enricher,
            transport,
            clock,
        )))
    }
}

fn default_storage() -> Arc<dyn Storage> {
    let path = FileStorage::default_path();
    match FileStorage::open(&path) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "durable storage unavailable, sessions will not persist");
            Arc::new(MemoryStorage::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStorage;

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = TrackerConfig::default().with_batch_size(0);
        let err = TrackerBuilder::new(cfg)
            .storage(Arc::new(MemoryStorage::new()))
            .build()
            .err()
            .expect("zero batch size must fail");
        assert!(err.to_string().contains("batch_size"));
    }
}
