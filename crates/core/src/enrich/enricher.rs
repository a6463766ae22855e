use std::sync::Arc;

use serde_json::{Value, json};

use crate::{
    enrich::{Environment, classify, utm_params},
    session::{SessionId, SessionStore},
    types::{Batch, Metadata, OutgoingEvent, QueuedEvent},
};

/// Send-time snapshot shared by every event in one batch.
#[derive(Debug, Clone)]
pub struct EnrichmentContext {
    pub page: String,
    pub session: SessionId,
    /// Filled into an event's metadata only where the event has no value.
    pub defaults: Metadata,
}

impl EnrichmentContext {
    pub fn apply(&self, event: QueuedEvent) -> OutgoingEvent {
        let mut metadata = event.metadata;
        for (key, value) in &self.defaults {
            metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        metadata.insert("page".into(), Value::String(self.page.clone()));
        metadata.insert("session_id".into(), Value::String(self.session.id.clone()));
        metadata.insert("timestamp".into(), json!(event.timestamp));

        OutgoingEvent {
            event_type: event.event_type,
            metadata,
        }
    }
}

/// Attaches identity and environment metadata right before transport.
pub struct Enricher {
    env: Arc<dyn Environment>,
    sessions: Arc<SessionStore>,
}

impl Enricher {
    pub fn new(env: Arc<dyn Environment>, sessions: Arc<SessionStore>) -> Self {
        Self { env, sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn environment(&self) -> &dyn Environment {
        self.env.as_ref()
    }

    /// Reads the environment and refreshes the session watermark.
    pub fn context(&self) -> EnrichmentContext {
        let mut defaults = Metadata::new();

        if let Some(viewport) = self.env.viewport() {
            defaults.insert("viewport_width".into(), json!(viewport.width));
            defaults.insert("viewport_height".into(), json!(viewport.height));
        }

        let user_agent = self.env.user_agent();
        let (device, os) = classify(user_agent.as_deref(), self.env.max_touch_points());
        defaults.insert("device_type".into(), json!(device.as_str()));
        defaults.insert("os".into(), json!(os.as_str()));

        if let Some(url) = self.env.url() {
            for (key, value) in utm_params(&url) {
                defaults.insert(key.into(), Value::String(value));
            }
        }

        if let Some(referrer) = self.env.referrer() {
            defaults.insert("referrer".into(), Value::String(referrer));
        }

        let first_visit = self.sessions.first_visit(&self.env.location());
        defaults.insert("first_seen_at".into(), json!(first_visit.first_seen_at));
        defaults.insert(
            "landing_page".into(),
            Value::String(first_visit.landing_page),
        );

        EnrichmentContext {
            page: self.env.page_path(),
            session: self.sessions.get_or_create_session_id(),
            defaults,
        }
    }

    pub fn enrich(&self, events: Vec<QueuedEvent>) -> Batch {
        let ctx = self.context();
        Batch {
            events: events.into_iter().map(|e| ctx.apply(e)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        enrich::PageEnvironment,
        session::MemoryStorage,
    };
    use reqwest::Url;

    fn enricher() -> Enricher {
        let env = PageEnvironment::new(
            Url::parse("https://shine.example/services?utm_source=google&utm_medium=cpc#pricing")
                .unwrap(),
        )
        .with_referrer("https://www.google.com/")
        .with_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)")
        .with_viewport(390, 844);
        let sessions = SessionStore::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(ManualClock::new(1_700_000_000_000)),
            30 * 60 * 1000,
            "glint",
        );
        Enricher::new(Arc::new(env), Arc::new(sessions))
    }

    #[test]
    fn fills_defaults_and_envelope() {
        let batch = enricher().enrich(vec![QueuedEvent::new("click", Metadata::new(), 77)]);
        let meta = &batch.events[0].metadata;

        assert_eq!(batch.events[0].event_type, "click");
        assert_eq!(meta["page"], "/services");
        assert_eq!(meta["timestamp"], 77);
        assert_eq!(meta["viewport_width"], 390);
        assert_eq!(meta["device_type"], "mobile");
        assert_eq!(meta["os"], "ios");
        assert_eq!(meta["utm_source"], "google");
        assert_eq!(meta["utm_medium"], "cpc");
        assert_eq!(meta["referrer"], "https://www.google.com/");
        assert_eq!(meta["landing_page"], "/services?utm_source=google&utm_medium=cpc#pricing");
        assert_eq!(meta["first_seen_at"], 1_700_000_000_000i64);
        assert!(meta["session_id"].as_str().is_some());
    }

    #[test]
    fn explicit_event_values_win_over_defaults() {
        let mut metadata = Metadata::new();
        metadata.insert("utm_source".into(), json!("newsletter"));
        metadata.insert("viewport_width".into(), json!(1024));

        let batch = enricher().enrich(vec![QueuedEvent::new("cta", metadata, 1)]);
        let meta = &batch.events[0].metadata;
        assert_eq!(meta["utm_source"], "newsletter");
        assert_eq!(meta["viewport_width"], 1024);
        assert_eq!(meta["utm_medium"], "cpc");
    }

    #[test]
    fn batch_shares_one_session_and_keeps_order() {
        let events = (0..3)
            .map(|i| QueuedEvent::new(format!("e{i}"), Metadata::new(), i))
            .collect();
        let batch = enricher().enrich(events);

        let types: Vec<_> = batch.events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, ["e0", "e1", "e2"]);
        let sid = &batch.events[0].metadata["session_id"];
        assert!(batch.events.iter().all(|e| &e.metadata["session_id"] == sid));
    }
}
