use serde::Serialize;

use crate::events::TrackedEvent;

/// Appended to a batch when the buffer shed events since the last flush.
#[derive(Debug, Clone, Serialize)]
pub struct EventsDropped {
    pub count: u64,
}

impl TrackedEvent for EventsDropped {
    const EVENT_TYPE: &'static str = "events_dropped";
}
