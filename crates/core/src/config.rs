use std::time::Duration;

use reqwest::Url;

use crate::error::{AnalyticsError, Result};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8888/.netlify/functions/track";
pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_MAX_QUEUE: usize = 200;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_SECTIONS: [&str; 7] = [
    "hero",
    "about",
    "portfolio",
    "services",
    "reviews",
    "faq",
    "contact",
];
pub const DEFAULT_SECTION_THRESHOLDS: [f64; 3] = [0.4, 0.6, 0.8];
pub const DEFAULT_STORAGE_NAMESPACE: &str = "glint";

/// Tunables for a tracker instance.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Ingestion URL every batch is POSTed to.
    pub endpoint: Url,
    /// Queue length that triggers an immediate flush. Above `max_queue` the
    /// size trigger can never fire and delivery is timer-only.
    pub batch_size: usize,
    /// Hard cap on buffered events; reaching it sheds the oldest half.
    pub max_queue: usize,
    /// Delay of the single pending flush timer.
    pub flush_interval: Duration,
    /// Inactivity window after which a new session id is minted.
    pub session_ttl: Duration,
    /// Tracked section ids, in document order (ties resolve to the earlier one).
    pub sections: Vec<String>,
    /// Intersection ratios the host observer reports at; a section below the
    /// lowest one does not count as visible.
    pub section_thresholds: Vec<f64>,
    /// Prefix for every durable storage key.
    pub storage_namespace: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_queue: DEFAULT_MAX_QUEUE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            session_ttl: DEFAULT_SESSION_TTL,
            sections: DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect(),
            section_thresholds: DEFAULT_SECTION_THRESHOLDS.to_vec(),
            storage_namespace: DEFAULT_STORAGE_NAMESPACE.to_string(),
        }
    }
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("DEFAULT_ENDPOINT is a valid URL")
}

fn ttl_from_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl TrackerConfig {
    /// Build a config from environment variables, falling back to defaults.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `GLINT_ENDPOINT` | `http://localhost:8888/.netlify/functions/track` | Ingestion URL |
    /// | `GLINT_BATCH_SIZE` | `20` | Queue length that forces a flush |
    /// | `GLINT_MAX_QUEUE` | `200` | Buffer cap before shedding |
    /// | `GLINT_FLUSH_INTERVAL_MS` | `5000` | Timer-driven flush delay |
    /// | `GLINT_SESSION_TTL_MINUTES` | `30` | Session inactivity window |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let endpoint = std::env::var("GLINT_ENDPOINT")
            .ok()
            .and_then(|v| Url::parse(v.trim()).ok())
            .unwrap_or(defaults.endpoint);

        let flush_interval = env_parse::<u64>("GLINT_FLUSH_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.flush_interval);

        let session_ttl = env_parse::<u64>("GLINT_SESSION_TTL_MINUTES")
            .map(ttl_from_minutes)
            .unwrap_or(defaults.session_ttl);

        Self {
            endpoint,
            batch_size: env_parse("GLINT_BATCH_SIZE").unwrap_or(defaults.batch_size),
            max_queue: env_parse("GLINT_MAX_QUEUE").unwrap_or(defaults.max_queue),
            flush_interval,
            session_ttl,
            ..defaults
        }
    }

    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_queue(mut self, max_queue: usize) -> Self {
        self.max_queue = max_queue;
        self
    }

    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(AnalyticsError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        if self.batch_size == 0 {
            return fail("batch_size must be > 0");
        }
        if self.max_queue < 2 {
            return fail("max_queue must be >= 2");
        }
        if self.flush_interval.is_zero() {
            return fail("flush_interval must be > 0");
        }
        if self.sections.is_empty() {
            return fail("at least one section must be tracked");
        }
        if self.sections.iter().any(|s| s.trim().is_empty()) {
            return fail("section ids must not be empty");
        }
        if self
            .section_thresholds
            .iter()
            .any(|t| !(*t > 0.0 && *t <= 1.0))
        {
            return fail("section thresholds must be within (0, 1]");
        }
        Ok(())
    }

    pub(crate) fn session_ttl_ms(&self) -> i64 {
        i64::try_from(self.session_ttl.as_millis()).unwrap_or(i64::MAX)
    }
}
