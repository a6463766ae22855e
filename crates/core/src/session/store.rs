use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    clock::Clock,
    error::Result,
    session::{Storage, new_session_token},
    types::FirstVisit,
};

/// Session id handed to a flush, and whether it was minted by this call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId {
    pub id: String,
    pub is_new: bool,
}

struct Keys {
    session_id: String,
    last_seen: String,
    first_seen_at: String,
    landing_page: String,
}

impl Keys {
    fn new(namespace: &str) -> Self {
        Self {
            session_id: format!("{namespace}.session_id"),
            last_seen: format!("{namespace}.session_last_seen"),
            first_seen_at: format!("{namespace}.first_seen_at"),
            landing_page: format!("{namespace}.landing_page"),
        }
    }
}

/// Session identity and first-visit attribution kept in durable storage.
///
/// Every read path degrades to an in-memory value when storage fails, so
/// callers never see an error.
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
    keys: Keys,
}

impl SessionStore {
    pub fn new(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        ttl_ms: i64,
        namespace: &str,
    ) -> Self {
        Self {
            storage,
            clock,
            ttl_ms,
            keys: Keys::new(namespace),
        }
    }

    /// Reuses the stored id while `now - last_seen <= ttl`, otherwise mints a
    /// new one. Either way the id is written back and the watermark moves to now.
    pub fn get_or_create_session_id(&self) -> SessionId {
        match self.try_session_id() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "session storage unavailable, using ephemeral id");
                SessionId {
                    id: new_session_token(),
                    is_new: true,
                }
            }
        }
    }

    fn try_session_id(&self) -> Result<SessionId> {
        let now = self.clock.now_ms();
        let last_seen = self
            .storage
            .get(&self.keys.last_seen)?
            .and_then(|v| v.parse::<i64>().ok());
        let existing = self.storage.get(&self.keys.session_id)?;

        let session = match (last_seen, existing) {
            (Some(seen), Some(id)) if now.saturating_sub(seen) <= self.ttl_ms && !id.is_empty() => {
                SessionId { id, is_new: false }
            }
            _ => {
                let id = new_session_token();
                debug!(session_id = %id, "minted new session");
                SessionId { id, is_new: true }
            }
        };

        let now = now.to_string();
        self.storage.set_many(&[
            (self.keys.session_id.as_str(), session.id.as_str()),
            (self.keys.last_seen.as_str(), now.as_str()),
        ])?;
        Ok(session)
    }

    /// Returns the stored first-visit record, creating it from `location`
    /// (path+query+fragment) if none exists. An existing record is never
    /// overwritten.
    pub fn first_visit(&self, location: &str) -> FirstVisit {
        match self.try_first_visit(location) {
            Ok(visit) => visit,
            Err(e) => {
                warn!(error = %e, "first-visit storage unavailable, not persisting");
                FirstVisit {
                    first_seen_at: self.clock.now_ms(),
                    landing_page: location.to_string(),
                }
            }
        }
    }

    fn try_first_visit(&self, location: &str) -> Result<FirstVisit> {
        let raw_ts = self.storage.get(&self.keys.first_seen_at)?;
        let landing_page = self.storage.get(&self.keys.landing_page)?;

        let first_seen_at = raw_ts.as_deref().and_then(|ts| ts.parse::<i64>().ok());
        if let (Some(ts), None) = (raw_ts.as_deref(), first_seen_at) {
            warn!(value = ts, "unparsable first-visit timestamp, replacing it");
        }

        if let (Some(first_seen_at), Some(landing_page)) = (first_seen_at, landing_page.clone()) {
            return Ok(FirstVisit {
                first_seen_at,
                landing_page,
            });
        }

        // A half-written or damaged record is completed rather than replaced,
        // so whichever part is still valid survives.
        let visit = FirstVisit {
            first_seen_at: first_seen_at.unwrap_or_else(|| self.clock.now_ms()),
            landing_page: landing_page.unwrap_or_else(|| location.to_string()),
        };
        let ts = visit.first_seen_at.to_string();
        self.storage.set_many(&[
            (self.keys.first_seen_at.as_str(), ts.as_str()),
            (self.keys.landing_page.as_str(), visit.landing_page.as_str()),
        ])?;
        Ok(visit)
    }
}
